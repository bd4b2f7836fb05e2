//! Repository behaviour against the in-memory backend.

use futures::future::join_all;

use personlayer::{
    bson::Uuid,
    memory::InMemoryStore,
    person::{PEOPLE_COLLECTION, fields},
    prelude::*,
    repository::{DEFAULT_AGE_TO_SET, DEFAULT_FOOD_TO_ADD},
    update::Update,
};
use personlayer_core::error::DocumentStoreError;

fn repository() -> PersonRepository<InMemoryStore> {
    PersonRepository::new(InMemoryStore::new())
}

fn john_doe() -> PersonDraft {
    PersonDraft::new("John Doe")
        .with_age(30)
        .with_favorite_foods(["Pizza", "Sushi"])
}

// =============================================================================
// CREATE / READ
// =============================================================================

#[tokio::test]
async fn created_person_reads_back_unchanged() {
    let repository = repository();

    let created = repository.create_one(john_doe()).await.unwrap();
    let found = repository.find_by_id(created.id).await.unwrap();

    assert_eq!(found, created);
    assert_eq!(found.name, "John Doe");
    assert_eq!(found.age, Some(30));
    assert_eq!(found.favorite_foods, vec!["Pizza", "Sushi"]);
}

#[tokio::test]
async fn empty_name_is_rejected_before_the_store() {
    let repository = repository();

    let outcome = repository.create_one(PersonDraft::new("")).await;

    assert!(matches!(outcome, Err(PersonError::Validation(ValidationError::EmptyName))));
    assert_eq!(repository.store().backend().count(PEOPLE_COLLECTION).await, 0);
}

#[tokio::test]
async fn whitespace_name_is_stored_as_given() {
    let repository = repository();

    let created = repository.create_one(PersonDraft::new(" ")).await.unwrap();

    assert_eq!(repository.find_by_id(created.id).await.unwrap().name, " ");
}

#[tokio::test]
async fn bulk_create_keeps_input_order_and_assigns_distinct_ids() {
    let repository = repository();

    let created = repository
        .create_many(vec![
            PersonDraft::new("p1"),
            PersonDraft::new("p2").with_age(2),
            PersonDraft::new("p3").with_favorite_foods(["tacos"]),
        ])
        .await
        .unwrap();

    let names: Vec<_> = created.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, ["p1", "p2", "p3"]);

    let mut ids: Vec<_> = created.iter().map(|person| person.id).collect();
    ids.sort_by_key(|id| id.to_string());
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn bulk_create_with_one_invalid_draft_stores_nothing() {
    let repository = repository();

    let outcome = repository
        .create_many(vec![PersonDraft::new("Ann"), PersonDraft::new("")])
        .await;

    assert!(matches!(outcome, Err(PersonError::Validation(_))));
    assert_eq!(repository.store().backend().count(PEOPLE_COLLECTION).await, 0);
}

#[tokio::test]
async fn find_by_name_is_an_exact_match() {
    let repository = repository();
    repository
        .create_many(vec![
            PersonDraft::new("Mary"),
            PersonDraft::new("Mary Ann"),
            PersonDraft::new("Mary"),
        ])
        .await
        .unwrap();

    assert_eq!(repository.find_by_name("Mary").await.unwrap().len(), 2);
    assert!(repository.find_by_name("mary").await.unwrap().is_empty());
}

#[tokio::test]
async fn find_one_by_food_matches_array_membership() {
    let repository = repository();
    repository
        .create_many(vec![
            PersonDraft::new("Ann").with_favorite_foods(["soup"]),
            PersonDraft::new("Bob").with_favorite_foods(["pasta", "burritos"]),
        ])
        .await
        .unwrap();

    let found = repository.find_one_by_food("burritos").await.unwrap();
    assert_eq!(found.map(|person| person.name), Some("Bob".to_string()));

    assert!(repository.find_one_by_food("kale").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let outcome = repository().find_by_id(Uuid::new()).await;

    assert!(matches!(outcome, Err(PersonError::NotFound(_))));
}

// =============================================================================
// UPDATE
// =============================================================================

#[tokio::test]
async fn load_modify_save_appends_exactly_one_hamburger() {
    let repository = repository();
    let created = repository.create_one(john_doe()).await.unwrap();

    let updated = repository.update_via_load_modify_save(created.id).await.unwrap();

    assert_eq!(updated.favorite_foods, vec!["Pizza", "Sushi", DEFAULT_FOOD_TO_ADD]);
    assert_eq!(updated.age, created.age);
    assert_eq!(repository.find_by_id(created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn load_modify_save_on_missing_id_is_not_found_and_writes_nothing() {
    let repository = repository();
    repository.create_one(john_doe()).await.unwrap();

    let outcome = repository.update_via_load_modify_save(Uuid::new()).await;

    assert!(matches!(outcome, Err(PersonError::NotFound(_))));
    assert_eq!(repository.store().backend().count(PEOPLE_COLLECTION).await, 1);
}

#[tokio::test]
async fn find_one_and_update_sets_age_and_keeps_the_rest() {
    let repository = repository();
    let created = repository.create_one(john_doe()).await.unwrap();

    let updated = repository
        .update_via_find_one_and_update("John Doe", DEFAULT_AGE_TO_SET)
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.age, Some(20));
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.favorite_foods, created.favorite_foods);
}

#[tokio::test]
async fn find_one_and_update_without_match_is_not_found() {
    let outcome = repository().update_via_find_one_and_update("Nobody", 20).await;

    assert!(matches!(outcome, Err(PersonError::NotFound(name)) if name == "Nobody"));
}

// =============================================================================
// DELETE
// =============================================================================

#[tokio::test]
async fn deletion_is_final() {
    let repository = repository();
    let created = repository.create_one(john_doe()).await.unwrap();

    let removed = repository.delete_by_id(created.id).await.unwrap();
    assert_eq!(removed, created);

    assert!(matches!(repository.find_by_id(created.id).await, Err(PersonError::NotFound(_))));
    assert!(matches!(repository.delete_by_id(created.id).await, Err(PersonError::NotFound(_))));
}

#[tokio::test]
async fn bulk_removal_with_no_match_reports_zero() {
    let repository = repository();
    repository.create_one(john_doe()).await.unwrap();

    let summary = repository.delete_many_default().await.unwrap();

    assert_eq!(summary.deleted_count, 0);
    assert_eq!(repository.store().backend().count(PEOPLE_COLLECTION).await, 1);
}

#[tokio::test]
async fn bulk_removal_takes_every_match() {
    let repository = repository();
    repository
        .create_many(vec![
            PersonDraft::new("Mary"),
            PersonDraft::new("Jo"),
            PersonDraft::new("Mary").with_age(40),
        ])
        .await
        .unwrap();

    let summary = repository.delete_many("Mary").await.unwrap();

    assert_eq!(summary, RemovalSummary { deleted_count: 2 });
    assert!(repository.find_by_name("Mary").await.unwrap().is_empty());
    assert_eq!(repository.find_by_name("Jo").await.unwrap().len(), 1);
}

// =============================================================================
// QUERY CHAIN
// =============================================================================

#[tokio::test]
async fn query_chain_sorts_limits_and_hides_age() {
    let repository = repository();
    repository
        .create_many(vec![
            PersonDraft::new("Zed").with_age(50).with_favorite_foods(["burritos"]),
            PersonDraft::new("Amy").with_age(22).with_favorite_foods(["tacos", "burritos"]),
            PersonDraft::new("Carl").with_age(33).with_favorite_foods(["tacos"]),
            PersonDraft::new("Bob").with_age(41).with_favorite_foods(["burritos"]),
        ])
        .await
        .unwrap();

    let results = repository.query_chain().await.unwrap();

    let names: Vec<_> = results.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, ["Amy", "Bob"]);
    assert!(results.iter().all(|person| person.age.is_none()));
    assert_eq!(results[0].favorite_foods, vec!["tacos", "burritos"]);
}

#[tokio::test]
async fn query_chain_on_empty_store_is_empty() {
    assert!(repository().query_chain().await.unwrap().is_empty());
}

#[tokio::test]
async fn stage_order_in_source_does_not_change_the_result() {
    let repository = repository();
    repository
        .create_many(vec![
            PersonDraft::new("Cy").with_age(3).with_favorite_foods(["tea"]),
            PersonDraft::new("Al").with_age(1).with_favorite_foods(["tea"]),
            PersonDraft::new("Bo").with_age(2).with_favorite_foods(["tea"]),
        ])
        .await
        .unwrap();

    let people = repository.store().typed_collection::<Person>();

    let projection_first = people
        .find(None)
        .select(Projection::include([fields::NAME]))
        .limit(2)
        .sort(fields::AGE, SortDirection::Desc)
        .execute()
        .await
        .unwrap();

    let filter_last = people
        .find(None)
        .sort(fields::AGE, SortDirection::Desc)
        .limit(2)
        .select(Projection::include([fields::NAME]))
        .filter(Filter::eq(fields::FAVORITE_FOODS, "tea"))
        .execute()
        .await
        .unwrap();

    let names: Vec<_> = projection_first.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, ["Cy", "Bo"]);
    assert_eq!(projection_first, filter_last);
    assert!(projection_first.iter().all(|person| person.favorite_foods.is_empty()));
}

#[tokio::test]
async fn projection_dropping_a_required_field_fails_to_decode() {
    let repository = repository();
    repository.create_one(john_doe()).await.unwrap();

    let outcome = repository
        .store()
        .typed_collection::<Person>()
        .find(None)
        .select(Projection::exclude([fields::NAME]))
        .execute()
        .await;

    assert!(matches!(outcome, Err(DocumentStoreError::Serialization(msg)) if msg.contains(fields::NAME)));
}

#[tokio::test]
async fn chain_does_nothing_until_executed() {
    let repository = repository();
    let people = repository.store().typed_collection::<Person>();

    let pending = people.find(None).sort(fields::NAME, SortDirection::Asc).limit(1);
    repository.create_one(PersonDraft::new("Late")).await.unwrap();

    assert_eq!(pending.stages().len(), 2);
    assert_eq!(pending.execute().await.unwrap().len(), 1);
}

// =============================================================================
// COMPLETION
// =============================================================================

#[tokio::test]
async fn callback_receives_the_single_outcome() {
    let repository = repository();
    let created = repository.create_one(john_doe()).await.unwrap();

    let mut seen = None;
    repository
        .find_by_id(created.id)
        .on_complete(|outcome| seen = Some(outcome))
        .await;

    assert_eq!(seen.unwrap().unwrap().id, created.id);
}

#[tokio::test]
async fn channel_delivers_errors_too() {
    let repository = repository();
    let (completer, pending) = channel();

    let (delivered, outcome) = futures::join!(
        repository.delete_by_id(Uuid::new()).deliver(completer),
        pending
    );

    assert!(delivered);
    assert!(matches!(outcome, Err(PersonError::NotFound(_))));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn concurrent_creates_all_land() {
    let repository = repository();

    let outcomes = join_all((0..16).map(|n| repository.create_one(PersonDraft::new(format!("p{n}"))))).await;

    assert!(outcomes.iter().all(Result::is_ok));
    assert_eq!(repository.store().backend().count(PEOPLE_COLLECTION).await, 16);
}

#[tokio::test]
async fn atomic_updates_do_not_lose_writes() {
    let repository = repository();
    repository.create_one(PersonDraft::new("Counter")).await.unwrap();
    let people = repository.store().typed_collection::<Person>();

    let outcomes = join_all((0..10).map(|n| {
        people.find_one_and_update(
            Filter::eq(fields::NAME, "Counter"),
            Update::new().push(fields::FAVORITE_FOODS, format!("dish-{n}")),
        )
    }))
    .await;

    assert!(outcomes.iter().all(|outcome| matches!(outcome, Ok(Some(_)))));

    let stored = repository.find_by_name("Counter").await.unwrap();
    assert_eq!(stored[0].favorite_foods.len(), 10);
}
