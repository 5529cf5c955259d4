use japi::memory::MemoryStore;
use japi::prelude::*;
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    value.as_object().unwrap().clone()
}

async fn models() -> Models {
    let models = Models::builder()
        .register(
            Schema::builder("person")
                .attribute("name", AttrType::String)
                .attribute("age", AttrType::Number)
                .build(),
        )
        .build(MemoryStore::new())
        .unwrap();
    models.connect().await.unwrap();
    models
}

async fn seed(models: &Models) -> Model {
    let people = models.model("person").unwrap();
    for (name, age) in [("A", 22), ("B", 32), ("C", 92)] {
        people
            .create(record(json!({"name": name, "age": age})))
            .await
            .unwrap();
    }
    people
}

#[tokio::test]
async fn create_assigns_monotonic_ids() {
    let models = models().await;
    let people = seed(&models).await;

    let ids: Vec<u64> = people.find(FindOptions::new()).await.unwrap().iter().map(Resource::id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // Deleting the tail must not free its id for reuse.
    assert!(people.delete(3).await.unwrap());
    let next = people.create(record(json!({"name": "D", "age": 1}))).await.unwrap();
    assert_eq!(next.id(), 4);
}

#[tokio::test]
async fn find_applies_operator_filters() {
    let models = models().await;
    let people = seed(&models).await;

    let results = people
        .find(
            FindOptions::builder()
                .filter("age", FilterTerm::from_value(json!({"$lt": 24})))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results.get(0).unwrap().id(), 1);
}

#[tokio::test]
async fn count_is_independent_of_pagination() {
    let models = models().await;
    let people = seed(&models).await;

    let page = people
        .find(FindOptions::builder().offset(1).limit(1).build())
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.count(), 3);
    assert_eq!(page.get(0).unwrap().id(), 2);
}

#[tokio::test]
async fn find_restricts_to_an_id_set() {
    let models = models().await;
    let people = seed(&models).await;

    let results = people.find(FindOptions::with_ids(vec![3, 1])).await.unwrap();
    let ids: Vec<u64> = results.iter().map(Resource::id).collect();
    // Requested order, not stored order.
    assert_eq!(ids, vec![3, 1]);
}

#[tokio::test]
async fn sort_orders_and_cascades() {
    let models = models().await;
    let people = models.model("person").unwrap();
    for (name, age) in [("B", 30), ("A", 30), ("C", 10)] {
        people
            .create(record(json!({"name": name, "age": age})))
            .await
            .unwrap();
    }

    let results = people
        .find(
            FindOptions::builder()
                .sort("age", SortDirection::Desc)
                .sort("name", SortDirection::Asc)
                .build(),
        )
        .await
        .unwrap();
    let names: Vec<Value> = results
        .iter()
        .map(|r| r.attribute("name").cloned().unwrap())
        .collect();
    assert_eq!(names, vec![json!("A"), json!("B"), json!("C")]);
}

#[tokio::test]
async fn sort_survives_mixed_types() {
    let models = models().await;
    let people = models.model("person").unwrap();
    people.create(record(json!({"name": "A", "age": 22}))).await.unwrap();
    people.create(record(json!({"name": "B", "age": "young"}))).await.unwrap();

    let results = people
        .find(FindOptions::builder().sort("age", SortDirection::Asc).build())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn sparse_fieldsets_keep_the_id() {
    let models = models().await;
    let people = seed(&models).await;

    let results = people
        .find(FindOptions::builder().fields(["age"]).build())
        .await
        .unwrap();
    let first = results.get(0).unwrap();
    assert_eq!(first.id(), 1);
    assert_eq!(first.attribute("age"), Some(&json!(22)));
    assert_eq!(first.attribute("name"), None);
}

#[tokio::test]
async fn find_one_returns_the_first_match_or_none() {
    let models = models().await;
    let people = seed(&models).await;

    let found = people
        .find_one(
            FindOptions::builder()
                .filter("age", FilterTerm::from_value(json!({"$gte": 30})))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.id()), Some(2));

    let none = people
        .find_one(
            FindOptions::builder()
                .filter("name", FilterTerm::Eq(json!("nobody")))
                .build(),
        )
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn update_patches_without_touching_the_id() {
    let models = models().await;
    let people = seed(&models).await;

    let updated = people
        .update(2, record(json!({"name": "Z", "id": 99})))
        .await
        .unwrap();
    assert_eq!(updated.id(), 2);
    assert_eq!(updated.attribute("name"), Some(&json!("Z")));
    assert_eq!(updated.attribute("age"), Some(&json!(32)));
}

#[tokio::test]
async fn missing_records_surface_not_found() {
    let models = models().await;
    let people = seed(&models).await;

    let err = people.update(42, record(json!({"name": "x"}))).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { ref type_name, id: 42 } if type_name == "person"));

    let err = people.delete(42).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { id: 42, .. }));
}

#[tokio::test]
async fn delete_removes_the_record() {
    let models = models().await;
    let people = seed(&models).await;

    assert!(people.delete(2).await.unwrap());
    let err = people.find_resource(2).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { id: 2, .. }));

    let results = people.find(FindOptions::new()).await.unwrap();
    assert_eq!(results.count(), 2);
    let remaining: Vec<u64> = results.iter().map(Resource::id).collect();
    assert_eq!(remaining, vec![1, 3]);
}

#[tokio::test]
async fn created_records_round_trip_through_find_resource() {
    let models = models().await;
    let people = models.model("person").unwrap();

    let created = people.create(record(json!({"name": "A"}))).await.unwrap();
    let found = people.find_resource(created.id()).await.unwrap();
    assert_eq!(found.id(), created.id());
    assert_eq!(found.attribute("name"), Some(&json!("A")));
}

#[tokio::test]
async fn unknown_types_are_rejected() {
    let models = models().await;
    let err = models.model("spaceship").unwrap_err();
    assert!(matches!(err, Error::UnknownType(ref name) if name == "spaceship"));
}
