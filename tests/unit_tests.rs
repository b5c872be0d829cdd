// Unit tests for Roomie Match

use roomie_match::auth::{hash_password, verify_password, TokenIssuer};
use roomie_match::core::{
    calculate_compatibility, compare_answers, find_mood, validate_answers, MatchFilter, MatchRanker, QuizError,
};
use roomie_match::models::{ChatMessage, QuizAnswerSet, RankingLimits, UserRecord};

fn answers(pairs: &[(&str, &str)]) -> QuizAnswerSet {
    pairs.iter().copied().collect()
}

fn candidate(id: &str, pairs: &[(&str, &str)]) -> UserRecord {
    let mut record = UserRecord::new(id, format!("User {}", id), format!("{}@test.local", id));
    record.quiz_answers = Some(answers(pairs));
    record.quiz_completed = true;
    record
}

#[test]
fn test_half_agreement_scores_fifty() {
    let mine = answers(&[("sleepSchedule", "early"), ("cleanliness", "very_clean")]);
    let theirs = answers(&[("sleepSchedule", "early"), ("cleanliness", "messy")]);

    assert_eq!(calculate_compatibility(Some(&mine), Some(&theirs)), 50);
}

#[test]
fn test_no_shared_questions_scores_zero() {
    let mine = answers(&[("sleepSchedule", "early")]);
    let theirs = answers(&[("noise", "quiet")]);

    assert_eq!(calculate_compatibility(Some(&mine), Some(&theirs)), 0);
}

#[test]
fn test_missing_side_scores_zero() {
    let mine = answers(&[("sleepSchedule", "early")]);

    assert_eq!(calculate_compatibility(Some(&mine), None), 0);
    assert_eq!(calculate_compatibility(None, Some(&mine)), 0);
    assert_eq!(calculate_compatibility(None, None), 0);
}

#[test]
fn test_score_is_symmetric_and_bounded() {
    let sets = [
        answers(&[("sleepSchedule", "early"), ("noise", "quiet"), ("guests", "rarely")]),
        answers(&[("sleepSchedule", "late"), ("noise", "quiet")]),
        answers(&[("guests", "rarely"), ("sharing", "communal"), ("noise", "")]),
        answers(&[("cleanliness", "messy")]),
    ];

    for a in &sets {
        for b in &sets {
            let ab = calculate_compatibility(Some(a), Some(b));
            let ba = calculate_compatibility(Some(b), Some(a));
            assert_eq!(ab, ba);
            assert!(ab <= 100);
        }
        assert_eq!(calculate_compatibility(Some(a), Some(a)), 100);
    }
}

#[test]
fn test_agreed_on_lists_matching_questions() {
    let mine = answers(&[("sleepSchedule", "early"), ("noise", "quiet"), ("guests", "rarely")]);
    let theirs = answers(&[("sleepSchedule", "early"), ("noise", "lively"), ("guests", "rarely")]);

    let result = compare_answers(&mine, &theirs);

    assert_eq!(result.compared, 3);
    assert_eq!(result.matched, 2);
    assert_eq!(result.score, 67);
    assert_eq!(result.agreed_on, vec!["guests".to_string(), "sleepSchedule".to_string()]);
}

#[test]
fn test_ranking_keeps_tie_order() {
    let ranker = MatchRanker::default();
    let mine = answers(&[("q1", "a"), ("q2", "a"), ("q3", "a"), ("q4", "a"), ("q5", "a"), ("q6", "a"), ("q7", "a"), ("q8", "a"), ("q9", "a"), ("q10", "a")]);

    // 3/10, 9/10, 9/10, 1/10 agreement
    let agree = |n: usize| -> Vec<(String, String)> {
        (1..=10)
            .map(|i| (format!("q{}", i), if i <= n { "a" } else { "b" }.to_string()))
            .collect()
    };
    let make = |id: &str, n: usize| {
        let mut record = UserRecord::new(id, id, format!("{}@test.local", id));
        record.quiz_answers = Some(agree(n).into_iter().collect());
        record.quiz_completed = true;
        record
    };

    let ranked = ranker.rank("me", &mine, vec![make("w", 3), make("x", 9), make("y", 9), make("z", 1)]);

    let order: Vec<(&str, u8)> = ranked.iter().map(|m| (m.user_id.as_str(), m.compatibility)).collect();
    assert_eq!(order, vec![("x", 90), ("y", 90), ("w", 30), ("z", 10)]);
}

#[test]
fn test_select_caps_limit() {
    let ranker = MatchRanker::new(RankingLimits {
        default_limit: 2,
        max_limit: 3,
    });
    let mine = answers(&[("noise", "quiet")]);
    let candidates = (0..10).map(|i| candidate(&format!("u{}", i), &[("noise", "quiet")])).collect();
    let ranked = ranker.rank("me", &mine, candidates);

    assert_eq!(ranker.select(&ranked, &MatchFilter::default()).len(), 2);
    let wide = MatchFilter {
        limit: Some(50),
        ..Default::default()
    };
    assert_eq!(ranker.select(&ranked, &wide).len(), 3);
}

#[test]
fn test_quiz_validation() {
    assert_eq!(validate_answers(&QuizAnswerSet::new()), Err(QuizError::Empty));
    assert!(validate_answers(&answers(&[("sleepSchedule", "late"), ("sharing", "communal")])).is_ok());
    assert!(matches!(
        validate_answers(&answers(&[("favouriteColour", "blue")])),
        Err(QuizError::UnknownQuestion(_))
    ));
    assert!(matches!(
        validate_answers(&answers(&[("noise", "silent")])),
        Err(QuizError::InvalidOption { .. })
    ));
}

#[test]
fn test_mood_lookup() {
    let focused = find_mood("FOCUSED").unwrap();
    assert_eq!(focused.emoji, "📚");
    assert!(find_mood("sleepy").is_none());

    let status = focused.status(None);
    assert_eq!(status.status, "Focused");
}

#[test]
fn test_tokens_and_passwords() {
    let issuer = TokenIssuer::new("unit-secret", 600);
    let token = issuer.issue("u1", "u1@test.local", "s1", issuer.expires_at()).unwrap();
    assert_eq!(issuer.verify(&token).unwrap().sid, "s1");

    let mut tampered = token.clone();
    tampered.push('x');
    assert!(issuer.verify(&tampered).is_err());

    let hash = hash_password("hunter2hunter2").unwrap();
    assert!(verify_password("hunter2hunter2", &hash));
    assert!(!verify_password("hunter3hunter3", &hash));
}

#[test]
fn test_ranking_against_memory_store() {
    use roomie_match::services::MemoryUserStore;

    let store = MemoryUserStore::with_users([
        candidate("me", &[("noise", "quiet"), ("guests", "rarely")]),
        candidate("a", &[("noise", "lively"), ("guests", "rarely")]),
        candidate("b", &[("noise", "quiet"), ("guests", "rarely")]),
    ]);

    let result = tokio_test::block_on(MatchRanker::default().find_matches(&store, "me")).unwrap();
    let ids: Vec<&str> = result.matches.iter().map(|m| m.user_id.as_str()).collect();

    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(result.total_candidates, 2);
}

#[test]
fn test_chat_message_wire_names() {
    let message = ChatMessage {
        message_id: "m1".to_string(),
        chat_id: "c1".to_string(),
        sender_id: "u1".to_string(),
        sender_name: "Sam".to_string(),
        text: "hi".to_string(),
        created_at: chrono::Utc::now(),
    };

    let json = serde_json::to_value(&message).unwrap();

    assert!(json.get("createdAt").is_some());
    assert!(json.get("timestamp").is_none());
    assert_eq!(json["senderName"], "Sam");
    assert_eq!(json["chatId"], "c1");
}
