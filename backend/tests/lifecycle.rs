use chrono::{TimeDelta, Utc};
use common::{LogInRequest, QuestFields, QuestId, SignUpRequest, UserId};
use quest_board::auth::{CredentialStore, TokenService};
use quest_board::error::{Entity, ServiceError};
use quest_board::store::{MemoryStore, Store};
use quest_board::AppState;
use std::sync::Arc;

fn app() -> (Arc<dyn Store>, Arc<AppState>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        TokenService::new(b"lifecycle-secret", TimeDelta::days(7)),
        CredentialStore::new(4),
    );
    (store, Arc::new(state))
}

async fn sign_up(state: &AppState, email: &str, username: &str) -> UserId {
    state
        .users
        .sign_up(SignUpRequest {
            email: email.to_owned(),
            password: String::from("secret1"),
            username: username.to_owned(),
        })
        .await
        .unwrap()
        .id
}

fn quest_fields(capacity: i64) -> QuestFields {
    QuestFields {
        title: String::from("Treasure hunt"),
        description: String::from("Find the chest"),
        category: String::from("games"),
        max_participants: capacity,
        deadline: Some(Utc::now() + TimeDelta::days(3)),
        ..QuestFields::default()
    }
}

#[tokio::test]
async fn sign_up_log_in_and_fill_a_quest() {
    let (_, state) = app();

    let alice = sign_up(&state, "a@x.com", "alice").await;
    assert_eq!(alice, UserId(1));
    let token = state
        .users
        .log_in(LogInRequest {
            email: String::from("a@x.com"),
            password: String::from("secret1"),
        })
        .await
        .unwrap();
    let caller = state.gate.authenticate(&token).unwrap();
    assert_eq!(caller, alice);

    let owner = sign_up(&state, "o@x.com", "owner").await;
    for _ in 0..4 {
        state.quests.create(owner, quest_fields(10)).await.unwrap();
    }
    let quest = state.quests.create(owner, quest_fields(1)).await.unwrap();
    assert_eq!(quest.id, QuestId(5));
    assert_eq!(quest.participants, 0);

    let joined = state.participation.join(caller, QuestId(5)).await.unwrap();
    assert_eq!(joined.participants, 1);
    assert_eq!(joined.remaining, 0);

    let bob = sign_up(&state, "b@x.com", "bob").await;
    assert!(matches!(
        state.participation.join(bob, QuestId(5)).await,
        Err(ServiceError::CapacityExceeded)
    ));
    assert_eq!(state.quests.get_by_id(QuestId(5)).await.unwrap().participants, 1);
}

#[tokio::test]
async fn join_cancel_round_trip() {
    let (_, state) = app();
    let owner = sign_up(&state, "o@x.com", "owner").await;
    let member = sign_up(&state, "m@x.com", "member").await;
    let quest = state.quests.create(owner, quest_fields(2)).await.unwrap();

    let before = state.quests.get_by_id(quest.id).await.unwrap().participants;
    state.participation.join(member, quest.id).await.unwrap();
    let after_cancel = state.participation.cancel(member, quest.id).await.unwrap();
    assert_eq!(after_cancel.participants, before);

    assert!(matches!(
        state.participation.cancel(member, quest.id).await,
        Err(ServiceError::NotFound(Entity::Participation))
    ));
}

#[tokio::test]
async fn non_owner_cannot_touch_a_quest() {
    let (_, state) = app();
    let owner = sign_up(&state, "o@x.com", "owner").await;
    let stranger = sign_up(&state, "s@x.com", "stranger").await;
    let quest = state.quests.create(owner, quest_fields(3)).await.unwrap();

    assert!(matches!(
        state.quests.update(stranger, quest.id, quest_fields(3)).await,
        Err(ServiceError::Forbidden)
    ));
    assert!(matches!(
        state.quests.delete(stranger, quest.id).await,
        Err(ServiceError::Forbidden)
    ));
    assert_eq!(state.quests.get_by_id(quest.id).await.unwrap(), quest);
}

#[tokio::test]
async fn deleting_an_account_cascades() {
    let (store, state) = app();
    let owner = sign_up(&state, "o@x.com", "owner").await;
    let member = sign_up(&state, "m@x.com", "member").await;

    let owned = state.quests.create(owner, quest_fields(3)).await.unwrap();
    let foreign = state.quests.create(member, quest_fields(3)).await.unwrap();
    state.participation.join(member, owned.id).await.unwrap();
    state.participation.join(owner, foreign.id).await.unwrap();

    state.users.delete_account(owner).await.unwrap();

    assert!(matches!(
        state.quests.get_by_id(owned.id).await,
        Err(ServiceError::NotFound(Entity::Quest))
    ));
    assert_eq!(store.participation(member, owned.id).await.unwrap(), None);
    assert_eq!(store.participation(owner, foreign.id).await.unwrap(), None);
    assert_eq!(state.quests.get_by_id(foreign.id).await.unwrap().participants, 0);
    assert!(state
        .participation
        .list_joined_by_user(member)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_joins_fill_exactly_to_capacity() {
    const USERS: usize = 24;
    let (store, state) = app();
    let owner = sign_up(&state, "o@x.com", "owner").await;
    let quest = state
        .quests
        .create(owner, quest_fields(USERS as i64 - 1))
        .await
        .unwrap();

    let mut members = Vec::with_capacity(USERS);
    for n in 0..USERS {
        members.push(sign_up(&state, &format!("u{n}@x.com"), &format!("u{n}")).await);
    }

    let handles: Vec<_> = members
        .into_iter()
        .map(|member| {
            let state = state.clone();
            tokio::spawn(async move { state.participation.join(member, quest.id).await })
        })
        .collect();

    let mut joined = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(ServiceError::CapacityExceeded) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!((joined, refused), (USERS - 1, 1));
    assert_eq!(
        store.participant_count(quest.id).await.unwrap(),
        USERS as u32 - 1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_racing_a_delete_leaves_no_orphan_membership() {
    let (store, state) = app();
    let owner = sign_up(&state, "o@x.com", "owner").await;
    let member = sign_up(&state, "m@x.com", "member").await;

    for _ in 0..50 {
        let quest = state.quests.create(owner, quest_fields(5)).await.unwrap();

        let joining = {
            let state = state.clone();
            tokio::spawn(async move { state.participation.join(member, quest.id).await })
        };
        let deleting = {
            let state = state.clone();
            tokio::spawn(async move { state.quests.delete(owner, quest.id).await })
        };

        match joining.await.unwrap() {
            Ok(_) | Err(ServiceError::NotFound(Entity::Quest)) => {}
            Err(other) => panic!("unexpected join error: {other:?}"),
        }
        match deleting.await.unwrap() {
            Ok(()) => {}
            Err(other) => panic!("unexpected delete error: {other:?}"),
        }
        assert_eq!(store.participation(member, quest.id).await.unwrap(), None);
        assert_eq!(store.participant_count(quest.id).await.unwrap(), 0);
    }
}
