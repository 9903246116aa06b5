//! Property-based tests for the field codec and quota routing

use super::testing::{key, service, TEST_USER};
use super::*;
use crate::conv::ConvState;
use proptest::prelude::*;

fn arb_token_type() -> impl Strategy<Value = TokenType> {
    prop_oneof![Just(TokenType::Web), Just(TokenType::Tcp)]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn field_codec_round_trips(token_type in arb_token_type(), key_id in "[A-Za-z0-9|_-]{1,40}") {
        let ctx = TokenContext::with_key(token_type, key_id.clone());
        let decoded = TokenContext::decode(&ctx.encode());
        prop_assert_eq!(decoded.token_type, token_type);
        prop_assert_eq!(decoded.key_id, key_id);
    }

    #[test]
    fn bare_field_decodes_as_web(key_id in "[A-Za-z0-9_-]{1,40}") {
        prop_assert_eq!(
            TokenContext::decode(&key_id),
            TokenContext::with_key(TokenType::Web, key_id.clone())
        );
    }

    /// At or over quota the user is offered regeneration; under it they go
    /// straight to the expiration question with no key attached.
    #[test]
    fn quota_decides_next_leg(token_type in arb_token_type(), existing in 0usize..5) {
        let (state, field) = block_on(async {
            let (svc, repo, _) = service();
            for i in 0..existing {
                repo.add_key(key(&format!("key-{i:04}"), token_type));
            }

            svc.create_token(TEST_USER).await.unwrap();
            svc.handle_message(TEST_USER, token_type.label()).await.unwrap();

            let conv = repo.conversation(TEST_USER).unwrap();
            let field = conv.current().unwrap().field.clone();
            (conv.state, field)
        });

        let expected_leg = if existing >= token_type.quota() {
            LEG_TOKEN_EXISTS
        } else {
            LEG_NEW_TOKEN
        };
        prop_assert_eq!(state, ConvState::InFlight { leg: Leg::new(expected_leg) });
        prop_assert_eq!(field, Some(TokenContext::new(token_type)));
    }
}
