use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use chiptrack::{
    AccountRequest, Animal, LifeStatus, Page, TimeRange,
};

/// Location point universe kept deliberately small so adjacency collisions
/// actually occur in generated movement sequences.
const POINTS: i32 = 8;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

/// Replays candidate movements through the aggregate, keeping whichever
/// appends the movement rules admit.
fn replay_movements(animal: &mut Animal, candidates: &[i32]) {
    for (i, point) in candidates.iter().enumerate() {
        let now = base_time() + Duration::minutes(i as i64 + 1);
        let _ = animal.append_visit(*point, now);
    }
}

/// A randomized edit against an animal's attached type set.
#[derive(Debug, Clone)]
pub enum TypeEdit {
    Attach(i32),
    Replace(i32, i32),
    Detach(i32),
}

/// Strategies for generating domain values
pub mod strategies {
    use proptest::prelude::*;

    use chiptrack::{AnimalUpdate, Gender, LifeStatus, NewAnimal};

    use super::{POINTS, TypeEdit};

    /// Strategy for generating genders
    pub fn gender_strategy() -> impl Strategy<Value = Gender> {
        prop_oneof![
            Just(Gender::Male),
            Just(Gender::Female),
            Just(Gender::Other),
        ]
    }

    /// Strategy for generating life statuses
    pub fn life_status_strategy() -> impl Strategy<Value = LifeStatus> {
        prop_oneof![Just(LifeStatus::Alive), Just(LifeStatus::Dead)]
    }

    /// Strategy for generating validated chipping parameters
    pub fn new_animal_strategy() -> impl Strategy<Value = NewAnimal> {
        (
            proptest::collection::btree_set(1..50i32, 1..4),
            0.1..1000.0f64,
            0.1..1000.0f64,
            0.1..1000.0f64,
            gender_strategy(),
            1..100i32,
            1..=POINTS,
        )
            .prop_map(
                |(types, length, weight, height, gender, chipper_id, chipping_location_id)| {
                    NewAnimal {
                        types: types.into_iter().collect(),
                        length,
                        weight,
                        height,
                        gender,
                        chipper_id,
                        chipping_location_id,
                    }
                },
            )
    }

    /// Strategy for generating validated update parameters
    pub fn update_strategy() -> impl Strategy<Value = AnimalUpdate> {
        (
            0.1..1000.0f64,
            0.1..1000.0f64,
            0.1..1000.0f64,
            gender_strategy(),
            life_status_strategy(),
            1..100i32,
            1..=POINTS,
        )
            .prop_map(
                |(length, weight, height, gender, life_status, chipper_id, chipping_location_id)| {
                    AnimalUpdate {
                        length,
                        weight,
                        height,
                        gender,
                        life_status,
                        chipper_id,
                        chipping_location_id,
                    }
                },
            )
    }

    /// Strategy for generating candidate movement sequences
    pub fn movement_strategy() -> impl Strategy<Value = Vec<i32>> {
        proptest::collection::vec(1..=POINTS, 0..12)
    }

    /// Strategy for generating type-set edits
    pub fn type_edit_strategy() -> impl Strategy<Value = TypeEdit> {
        prop_oneof![
            (1..20i32).prop_map(TypeEdit::Attach),
            (1..20i32, 1..20i32).prop_map(|(old, new)| TypeEdit::Replace(old, new)),
            (1..20i32).prop_map(TypeEdit::Detach),
        ]
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // The chipping location counts as the predecessor of position 0.
    #[test]
    fn visit_sequences_never_repeat_adjacent_points(
        params in strategies::new_animal_strategy(),
        candidates in strategies::movement_strategy(),
    ) {
        let mut animal = Animal::chip(params, base_time());
        replay_movements(&mut animal, &candidates);

        if let Some(first) = animal.visits().first() {
            prop_assert_ne!(first.location_id, animal.chipping_location_id);
        }
        for pair in animal.visits().windows(2) {
            prop_assert_ne!(pair[0].location_id, pair[1].location_id);
            prop_assert!(pair[0].visited_at <= pair[1].visited_at);
        }
    }

    #[test]
    fn append_admissibility_matches_the_current_position(
        params in strategies::new_animal_strategy(),
        candidates in strategies::movement_strategy(),
        candidate in 1..=POINTS,
    ) {
        let mut animal = Animal::chip(params, base_time());
        replay_movements(&mut animal, &candidates);

        let current = animal
            .visits()
            .last()
            .map(|visit| visit.location_id)
            .unwrap_or(animal.chipping_location_id);
        prop_assert_eq!(animal.validate_append(candidate).is_ok(), candidate != current);
    }

    #[test]
    fn dead_animals_never_move(
        params in strategies::new_animal_strategy(),
        mut update in strategies::update_strategy(),
        candidate in 1..=POINTS,
    ) {
        let mut animal = Animal::chip(params, base_time());
        update.life_status = LifeStatus::Dead;
        animal
            .apply_update(&update, base_time() + Duration::hours(1))
            .unwrap();

        prop_assert!(animal.validate_append(candidate).is_err());
        prop_assert!(animal.append_visit(candidate, base_time() + Duration::hours(2)).is_err());
        prop_assert!(animal.visits().is_empty());
    }

    // Visits appended through the public API carry ID 0 until storage
    // assigns one, so ID 0 addresses the head position here.
    #[test]
    fn head_moves_preserve_length_timestamps_and_adjacency(
        params in strategies::new_animal_strategy(),
        candidates in strategies::movement_strategy(),
        new_point in 1..=POINTS,
    ) {
        let mut animal = Animal::chip(params, base_time());
        replay_movements(&mut animal, &candidates);

        let before: Vec<(i32, DateTime<Utc>)> = animal
            .visits()
            .iter()
            .map(|visit| (visit.location_id, visit.visited_at))
            .collect();
        let outcome = animal
            .move_visit(0, new_point)
            .map(|visit| (visit.location_id, visit.visited_at));
        let after: Vec<(i32, DateTime<Utc>)> = animal
            .visits()
            .iter()
            .map(|visit| (visit.location_id, visit.visited_at))
            .collect();

        match outcome {
            Ok((moved_point, moved_at)) => {
                prop_assert!(!before.is_empty());
                prop_assert_eq!(moved_point, new_point);
                prop_assert_eq!(after.len(), before.len());
                prop_assert_eq!(moved_at, before[0].1);
                prop_assert_eq!(after[0].0, new_point);
                prop_assert_ne!(new_point, animal.chipping_location_id);
                if after.len() > 1 {
                    prop_assert_ne!(after[1].0, new_point);
                }
                prop_assert_eq!(&after[1..], &before[1..]);
            }
            Err(_) => {
                prop_assert_eq!(after, before);
            }
        }
    }

    #[test]
    fn head_removal_cascades_exactly_when_the_origin_is_restated(
        params in strategies::new_animal_strategy(),
        candidates in strategies::movement_strategy(),
    ) {
        let mut animal = Animal::chip(params, base_time());
        replay_movements(&mut animal, &candidates);

        let points: Vec<i32> = animal
            .visits()
            .iter()
            .map(|visit| visit.location_id)
            .collect();
        match animal.remove_visit(0) {
            Err(_) => prop_assert!(points.is_empty()),
            Ok(removed) => {
                let restated =
                    points.len() >= 2 && points[1] == animal.chipping_location_id;
                let expected = if restated { 2 } else { 1 };
                prop_assert_eq!(removed.len(), expected);
                let tail: Vec<i32> = animal
                    .visits()
                    .iter()
                    .map(|visit| visit.location_id)
                    .collect();
                prop_assert_eq!(tail, points[expected..].to_vec());
            }
        }
    }

    #[test]
    fn death_is_terminal_and_stamped_once(
        params in strategies::new_animal_strategy(),
        updates in proptest::collection::vec(strategies::update_strategy(), 1..6),
    ) {
        let mut animal = Animal::chip(params, base_time());
        let mut recorded: Option<DateTime<Utc>> = None;

        for (i, update) in updates.iter().enumerate() {
            let now = base_time() + Duration::hours(i as i64 + 1);
            let was_dead = animal.life_status() == LifeStatus::Dead;
            let result = animal.apply_update(update, now);

            prop_assert_eq!(
                result.is_err(),
                was_dead && update.life_status == LifeStatus::Alive
            );
            if result.is_ok() && update.life_status == LifeStatus::Dead && recorded.is_none() {
                recorded = Some(now);
            }
            prop_assert_eq!(animal.death_at(), recorded);
            if was_dead {
                prop_assert_eq!(animal.life_status(), LifeStatus::Dead);
            }
        }
    }

    #[test]
    fn type_edits_keep_the_set_unique_and_nonempty(
        params in strategies::new_animal_strategy(),
        edits in proptest::collection::vec(strategies::type_edit_strategy(), 0..16),
    ) {
        let mut animal = Animal::chip(params, base_time());

        for edit in &edits {
            let before = animal.types().to_vec();
            let result = match edit {
                TypeEdit::Attach(type_id) => animal.attach_type(*type_id),
                TypeEdit::Replace(old, new) => animal.replace_type(*old, *new),
                TypeEdit::Detach(type_id) => animal.detach_type(*type_id),
            };

            prop_assert!(!animal.types().is_empty());
            let mut seen = std::collections::HashSet::new();
            prop_assert!(animal.types().iter().all(|type_id| seen.insert(*type_id)));
            if result.is_err() {
                prop_assert_eq!(animal.types(), before.as_slice());
            }
        }
    }

    #[test]
    fn page_defaults_and_bounds(
        from in proptest::option::of(-5i64..50),
        size in proptest::option::of(-5i64..50),
    ) {
        match Page::new(from, size) {
            Ok(page) => {
                prop_assert_eq!(page.from, from.unwrap_or(0));
                prop_assert_eq!(page.size, size.unwrap_or(10));
                prop_assert!(page.from >= 0);
                prop_assert!(page.size > 0);
            }
            Err(_) => {
                prop_assert!(from.unwrap_or(0) < 0 || size.unwrap_or(10) <= 0);
            }
        }
    }

    #[test]
    fn time_bounds_parse_independently(
        minutes in 0i64..1_000_000,
        with_start in any::<bool>(),
        with_end in any::<bool>(),
    ) {
        let stamp = base_time() + Duration::minutes(minutes);
        let raw = stamp.to_rfc3339();
        let range = TimeRange::parse(
            with_start.then_some(raw.as_str()),
            with_end.then_some(raw.as_str()),
        )
        .unwrap();

        prop_assert_eq!(range.start, with_start.then_some(stamp));
        prop_assert_eq!(range.end, with_end.then_some(stamp));
        prop_assert_eq!(range.is_constrained(), with_start || with_end);
    }

    #[test]
    fn well_formed_registrations_validate(
        local in "[a-z]{1,8}",
        domain in "[a-z]{1,8}",
        tld in "[a-z]{2,3}",
        first_name in "[A-Za-z]{1,12}",
        last_name in "[A-Za-z]{1,12}",
        password in "[a-zA-Z0-9]{4,16}",
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        let request = AccountRequest {
            first_name: Some(first_name.clone()),
            last_name: Some(last_name.clone()),
            email: Some(email.clone()),
            password: Some(password.clone()),
        };

        let validated = request.validate();
        prop_assert!(validated.is_ok());
        let account = validated.unwrap();
        prop_assert_eq!(account.first_name, first_name);
        prop_assert_eq!(account.last_name, last_name);
        prop_assert_eq!(account.email, email);
        prop_assert_eq!(account.password, password);
    }

    #[test]
    fn blank_fields_never_validate(
        which in 0usize..4,
        padding in " {0,3}",
    ) {
        let field = |index: usize| {
            if index == which {
                Some(padding.clone())
            } else {
                Some("valid".to_string())
            }
        };
        let request = AccountRequest {
            first_name: field(0),
            last_name: field(1),
            email: field(2).map(|s| if s.trim().is_empty() { s } else { format!("{}@x.io", s) }),
            password: field(3),
        };

        prop_assert!(request.validate().is_err());
    }
}
