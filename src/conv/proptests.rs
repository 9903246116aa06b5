//! Property-based tests for the questionnaire cursor

use super::*;
use proptest::prelude::*;

fn arb_questions() -> impl Strategy<Value = Vec<Question<String>>> {
    proptest::collection::vec(
        (
            "[a-z ]{1,20}",
            proptest::collection::vec("[a-z0-9]{1,8}", 1..5),
        )
            .prop_map(|(text, answers)| Question::new(text, answers)),
        1..6,
    )
}

proptest! {
    /// After k valid answers the cursor sits at k and `current` is question k.
    #[test]
    fn cursor_tracks_valid_answers(questions in arb_questions(), pick in any::<prop::sample::Index>()) {
        let n = questions.len();
        let mut q = Questionnaire::new(questions.clone());

        for (k, question) in questions.iter().enumerate() {
            prop_assert_eq!(q.position(), k);
            prop_assert_eq!(q.current().unwrap(), question);
            prop_assert!(q.results().is_err());

            let answer = pick.get(&question.answers);
            let done = q.process_answer(answer).unwrap();
            prop_assert_eq!(done, k + 1 == n);
        }

        prop_assert_eq!(q.position(), n);
        prop_assert_eq!(q.current().unwrap_err(), ConvError::NoMoreQuestions);
        let results = q.results().unwrap();
        prop_assert!(results.iter().all(|qa| !qa.answer.is_empty()));
    }

    /// Answers outside the choice set never move the cursor.
    #[test]
    fn mismatched_answers_leave_cursor(questions in arb_questions(), bogus in "[A-Z_]{1,10}") {
        let mut q = Questionnaire::new(questions);
        let before = q.clone();

        let err = q.process_answer(&bogus).unwrap_err();
        prop_assert_eq!(err, ConvError::InvalidAnswer { answer: bogus.clone() });
        prop_assert_eq!(q, before);
    }

    /// A conversation reports the same leg on every submit of that leg.
    #[test]
    fn submit_reports_running_leg(questions in arb_questions(), leg in "[a-z_]{1,16}") {
        let answers: Vec<String> = questions.iter().map(|q| q.answers[0].clone()).collect();
        let mut conv = Conversation::new("user");
        conv.start(Leg::new(leg.clone()), Questionnaire::new(questions)).unwrap();

        for answer in &answers {
            prop_assert_eq!(conv.submit(answer).unwrap(), Leg::new(leg.clone()));
        }

        prop_assert_eq!(&conv.state, &ConvState::Complete);
        prop_assert_eq!(conv.results().unwrap().len(), answers.len());
        prop_assert_eq!(&conv.state, &ConvState::Idle);
    }
}
