//! Property tests for the single-live-vote rule

use std::collections::HashMap;
use std::sync::Arc;

use pollgate::polls::{Poll, PollError, PollStore};
use proptest::prelude::*;

/// Every voter in the map is counted exactly once, on the option the map
/// names, and nobody else is counted anywhere.
fn assert_consistent(poll: &Poll) -> Result<(), TestCaseError> {
    let mut counted: HashMap<&str, Vec<&str>> = HashMap::new();
    for option in &poll.options {
        for voter in &option.votes {
            counted.entry(voter.as_str()).or_default().push(option.id.as_str());
        }
    }

    prop_assert_eq!(counted.len(), poll.voters.len());
    for (voter, option_ids) in &counted {
        prop_assert_eq!(option_ids.len(), 1, "{} counted on {:?}", voter, option_ids);
        prop_assert_eq!(poll.vote_of(voter), Some(option_ids[0]));
    }
    prop_assert_eq!(poll.total_votes(), poll.voters.len());
    Ok(())
}

fn ballots() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..6).prop_flat_map(|options| {
        // option index == options means "unknown option"
        let ballot = (0usize..5, 0usize..=options);
        (Just(options), prop::collection::vec(ballot, 0..40))
    })
}

proptest! {
    /// Property: any ballot sequence leaves each voter on exactly one option
    #[test]
    fn ballots_keep_one_live_vote_per_voter((options, ballots) in ballots()) {
        let store = PollStore::new();
        let texts: Vec<String> = (0..options).map(|i| format!("option {}", i)).collect();
        let poll = store.create_poll("Which?", &texts).unwrap();

        let mut expected: HashMap<String, String> = HashMap::new();
        for (voter, choice) in ballots {
            let voter_id = format!("voter-{}", voter);
            let option_id = poll
                .options
                .get(choice)
                .map(|o| o.id.clone())
                .unwrap_or_else(|| "unknown".to_string());

            match store.vote(&poll.id, &option_id, &voter_id) {
                Ok(snapshot) => {
                    prop_assert!(choice < options);
                    expected.insert(voter_id.clone(), option_id.clone());
                    prop_assert_eq!(snapshot.vote_of(&voter_id), Some(option_id.as_str()));
                    assert_consistent(&snapshot)?;
                }
                Err(e) => {
                    prop_assert_eq!(choice, options);
                    let is_option_not_found = matches!(e, PollError::OptionNotFound { .. });
                    prop_assert!(is_option_not_found);
                }
            }
        }

        let poll = store.get_poll(&poll.id).unwrap();
        assert_consistent(&poll)?;
        prop_assert_eq!(poll.voters.len(), expected.len());
        for (voter, option_id) in &expected {
            prop_assert_eq!(poll.vote_of(voter), Some(option_id.as_str()));
        }
    }

    /// Property: option texts are kept verbatim and in order
    #[test]
    fn option_texts_are_kept_in_order(texts in prop::collection::vec(".*", 2..8)) {
        let store = PollStore::new();
        let poll = store.create_poll("Q", &texts).unwrap();
        let stored: Vec<&str> = poll.options.iter().map(|o| o.text.as_str()).collect();
        let given: Vec<&str> = texts.iter().map(String::as_str).collect();
        prop_assert_eq!(stored, given);
    }
}

#[test]
fn concurrent_voters_keep_mapping_consistent() {
    let store = Arc::new(PollStore::new());
    let poll = store
        .create_poll("Lunch?", &["Pizza", "Salad", "Tacos"])
        .unwrap();
    let option_ids: Vec<String> = poll.options.iter().map(|o| o.id.clone()).collect();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = store.clone();
            let poll_id = poll.id.clone();
            let option_ids = option_ids.clone();
            std::thread::spawn(move || {
                for round in 0..200 {
                    let voter = format!("voter-{}", (worker + round) % 10);
                    let option = &option_ids[(worker * 7 + round) % option_ids.len()];
                    store.vote(&poll_id, option, &voter).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let poll = store.get_poll(&poll.id).unwrap();
    assert_eq!(poll.voters.len(), 10);
    assert_eq!(poll.total_votes(), 10);
    for option in &poll.options {
        for voter in &option.votes {
            assert_eq!(poll.vote_of(voter), Some(option.id.as_str()));
        }
    }
}
