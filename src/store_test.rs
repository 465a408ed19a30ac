use super::*;
use crate::models::TxKind;

fn local_backend() -> Backend {
    let dir = std::env::temp_dir().join(format!("uang-sakti-store-{}", Uuid::new_v4()));
    let config: AppConfig = AppConfig::from_figment(
        &rocket::figment::Figment::new().merge(("data_dir", dir)),
    )
    .unwrap();
    Backend::connect(&config).unwrap()
}

async fn signed_in(backend: &Backend, email: &str) -> Session {
    backend.sign_up(email, "rahasia1").await.unwrap();
    backend.sign_in(email, "rahasia1").await.unwrap()
}

#[test]
fn email_normalization() {
    assert_eq!(normalize_email("  Budi@Example.COM ").unwrap(), "budi@example.com");
    assert!(normalize_email("budi").is_err());
    assert!(normalize_email("@example.com").is_err());
    assert!(normalize_email("a@b@c").is_err());
}

#[test]
fn password_hash_verifies_only_the_original() {
    let hash = hash_password("rahasia1").unwrap();
    assert!(verify_password(&hash, "rahasia1"));
    assert!(!verify_password(&hash, "rahasia2"));
    assert!(!verify_password("not-a-hash", "rahasia1"));
}

#[rocket::async_test]
async fn local_sign_up_rules() {
    let backend = local_backend();
    assert_eq!(backend.name(), "local");

    let short = backend.sign_up("budi@example.com", "12345").await.unwrap_err();
    assert_eq!(short.to_string(), "Password should be at least 6 characters");

    let registration = backend.sign_up("Budi@Example.com", "rahasia1").await.unwrap();
    assert_eq!(registration.user.email, "budi@example.com");
    assert!(registration.access_token.is_none());

    let duplicate = backend.sign_up("budi@example.com", "rahasia1").await.unwrap_err();
    assert_eq!(duplicate.to_string(), "User already registered");
}

#[rocket::async_test]
async fn local_sign_in_and_out() {
    let backend = local_backend();
    backend.sign_up("budi@example.com", "rahasia1").await.unwrap();

    let wrong = backend.sign_in("budi@example.com", "salah123").await.unwrap_err();
    assert_eq!(wrong.to_string(), "Invalid login credentials");
    let unknown = backend.sign_in("siti@example.com", "rahasia1").await.unwrap_err();
    assert_eq!(unknown.to_string(), "Invalid login credentials");

    let session = backend.sign_in("budi@example.com", "rahasia1").await.unwrap();
    let user = backend.current_user(&session.token).await.unwrap().unwrap();
    assert_eq!(user, session.user);

    backend.sign_out(&session.token).await.unwrap();
    assert!(backend.current_user(&session.token).await.unwrap().is_none());
}

#[rocket::async_test]
async fn only_five_sessions_survive() {
    let backend = local_backend();
    backend.sign_up("budi@example.com", "rahasia1").await.unwrap();
    let mut tokens = Vec::new();
    for _ in 0..6 {
        tokens.push(backend.sign_in("budi@example.com", "rahasia1").await.unwrap().token);
    }
    let mut alive = 0;
    for token in &tokens {
        if backend.current_user(token).await.unwrap().is_some() {
            alive += 1;
        }
    }
    assert_eq!(alive, 5);
    assert!(backend.current_user(&tokens[5]).await.unwrap().is_some());
}

#[rocket::async_test]
async fn profile_is_read_for_the_session_user() {
    let backend = local_backend();
    let session = signed_in(&backend, "budi@example.com").await;
    assert!(backend.profile(&session).await.unwrap().is_none());
    backend
        .insert_profile(None, &Profile { id: session.user.id.clone(), name: "Budi".into() })
        .await
        .unwrap();
    assert_eq!(backend.profile(&session).await.unwrap().unwrap().name, "Budi");
}

#[rocket::async_test]
async fn rows_never_leak_between_users() {
    let backend = local_backend();
    let budi = signed_in(&backend, "budi@example.com").await;
    let siti = signed_in(&backend, "siti@example.com").await;

    backend
        .insert_transaction(
            &budi,
            &NewTransaction {
                date: "2024-01-05".into(),
                category: "Food".into(),
                amount: 50_000,
                description: None,
                user_id: budi.user.id.clone(),
                kind: TxKind::Expense,
                receipt_url: None,
            },
        )
        .await
        .unwrap();
    backend
        .insert_category(
            &budi,
            &NewCategory { name: "Food".into(), kind: TxKind::Expense, user_id: budi.user.id.clone() },
        )
        .await
        .unwrap();

    assert!(backend.list_transactions(&siti).await.unwrap().is_empty());
    assert!(backend.list_categories(&siti).await.unwrap().is_empty());

    let tx = backend.list_transactions(&budi).await.unwrap().remove(0);
    backend.delete_transaction(&siti, &tx.id).await.unwrap();
    assert_eq!(backend.list_transactions(&budi).await.unwrap().len(), 1);

    let edit = TransactionEdit {
        date: "2024-01-06".into(),
        category: "Makan".into(),
        amount: 45_000,
        description: Some("warung".into()),
    };
    backend.update_transaction(&budi, &tx.id, &edit).await.unwrap();
    let updated = backend.list_transactions(&budi).await.unwrap().remove(0);
    assert_eq!(updated.amount, 45_000);
    assert_eq!(updated.description.as_deref(), Some("warung"));

    let category = backend.list_categories(&budi).await.unwrap().remove(0);
    backend.rename_category(&budi, &category.id, "Makanan").await.unwrap();
    assert_eq!(backend.list_categories(&budi).await.unwrap()[0].name, "Makanan");
    backend.delete_category(&budi, &category.id).await.unwrap();
    assert!(backend.list_categories(&budi).await.unwrap().is_empty());

    backend.delete_transaction(&budi, &tx.id).await.unwrap();
    assert!(backend.list_transactions(&budi).await.unwrap().is_empty());
}
