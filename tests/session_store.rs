use tasknest::credential::{Argon2Hasher, CredentialHasher, PlaintextHasher};
use tasknest::error::Error;
use tasknest::port::{self, MemoryStore};
use tasknest::session::{
    SessionState, SessionStore, User, MSG_INVALID_CREDENTIALS, PREVIOUS_PASSWORDS_KEY, USER_KEY,
};
use tasknest::task::{Task, TaskStore};

fn cheap_argon2() -> Box<dyn CredentialHasher> {
    Box::new(Argon2Hasher::new(8, 1, 1).unwrap())
}

fn session_with(port: MemoryStore, hasher: Box<dyn CredentialHasher>) -> SessionStore<MemoryStore> {
    SessionStore::new(TaskStore::with_samples().into_shared(), port, hasher)
}

#[test]
fn duplicate_registration_keeps_first_password() {
    let port = MemoryStore::new();
    let mut session = session_with(port.clone(), cheap_argon2());

    session.register("a@x.com", "p1").unwrap();
    let err = session.register("a@x.com", "p2").unwrap_err();
    assert!(matches!(err, Error::DuplicateAccount(_)));

    let stored: User = port::get_json(&port, USER_KEY).unwrap().unwrap();
    assert!(session.hasher().verify("p1", &stored.credential));
    assert!(!session.hasher().verify("p2", &stored.credential));
}

#[test]
fn duplicate_registration_plaintext_keeps_first_password() {
    let port = MemoryStore::new();
    let mut session = session_with(port.clone(), Box::new(PlaintextHasher));

    session.register("a@x.com", "p1").unwrap();
    assert!(session.register("a@x.com", "p2").is_err());

    let stored: User = port::get_json(&port, USER_KEY).unwrap().unwrap();
    assert_eq!(stored.credential, "p1");
}

#[test]
fn register_sign_out_sign_in() {
    let mut session = session_with(MemoryStore::new(), cheap_argon2());

    session.register("a@x.com", "p1").unwrap();
    session.sign_out().unwrap();
    assert_eq!(session.state(), SessionState::Anonymous);

    session.sign_in("a@x.com", "p1").unwrap();
    assert!(session.is_logged_in());
    assert_eq!(session.current_profile().unwrap().username, "a@x.com");
}

#[test]
fn wrong_password_is_rejected_without_side_effects() {
    let mut session = session_with(MemoryStore::new(), cheap_argon2());

    let err = session.sign_in("a@x.com", "wrong").unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
    assert!(!session.is_logged_in());
    assert_eq!(session.last_message(), MSG_INVALID_CREDENTIALS);

    let user = session.register("a@x.com", "p1").unwrap();
    assert!(session.sign_in("a@x.com", "wrong").is_err());
    assert_eq!(session.current_user(), Some(&user));
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[test]
fn fresh_session_restores_registration() {
    let port = MemoryStore::new();
    let mut first = session_with(port.clone(), cheap_argon2());
    first.register("a@x.com", "p1").unwrap();

    let mut second = session_with(port, cheap_argon2());
    assert!(second.fetch_user().unwrap());
    assert_eq!(second.current_user().unwrap().email, "a@x.com");
    assert_eq!(second.previous_passwords(), first.previous_passwords());
}

#[test]
fn history_holds_hashes_not_passwords() {
    let port = MemoryStore::new();
    let mut session = session_with(port.clone(), cheap_argon2());
    session.register("a@x.com", "p1").unwrap();
    session.register("b@x.com", "p2").unwrap();

    let history: Vec<String> = port::get_json(&port, PREVIOUS_PASSWORDS_KEY)
        .unwrap()
        .unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|entry| entry.starts_with("$argon2id$")));
    assert!(!history.contains(&"p1".to_string()));
}

#[test]
fn current_user_tasks_come_from_the_shared_store() {
    let tasks = TaskStore::new().into_shared();
    let mut session = SessionStore::new(tasks.clone(), MemoryStore::new(), Box::new(PlaintextHasher));
    assert!(session.tasks_for_current_user().is_empty());

    let user = session.register("a@x.com", "p1").unwrap();
    tasks.borrow_mut().add(Task::new(1, "Mine", user.id));
    tasks.borrow_mut().add(Task::new(2, "Theirs", user.id + 1));

    let mine = session.tasks_for_current_user();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, 1);

    session.sign_out().unwrap();
    assert!(session.tasks_for_current_user().is_empty());
}
