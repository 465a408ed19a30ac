use super::*;

fn figment() -> Figment {
    Figment::new()
}

#[test]
fn defaults_to_local_backend() {
    let config = AppConfig::from_figment(&figment()).unwrap();
    assert_eq!(config.backend, BackendKind::Local);
    assert_eq!(config.data_dir, PathBuf::from("data"));
    assert_eq!(config.database_path(), PathBuf::from("data/uang_sakti.sqlite"));
    assert_eq!(config.receipts_dir(), PathBuf::from("data/receipts"));
    assert_eq!(
        config.receipt_limits(),
        ReceiptLimits { max_bytes: 512 * 1024, max_dimension: 800 }
    );
    assert!(config.cloudinary.is_none());
}

#[test]
fn supabase_backend_requires_credentials() {
    let err = AppConfig::from_figment(&figment().merge(("backend", "supabase"))).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn supabase_backend_reads_nested_table() {
    let config = AppConfig::from_figment(
        &figment()
            .merge(("backend", "supabase"))
            .merge(("supabase.url", "https://demo.supabase.co"))
            .merge(("supabase.anon_key", "anon")),
    )
    .unwrap();
    assert_eq!(config.backend, BackendKind::Supabase);
    assert_eq!(
        config.supabase,
        Some(SupabaseConfig { url: "https://demo.supabase.co".into(), anon_key: "anon".into() })
    );
}

#[test]
fn empty_cloudinary_preset_is_rejected() {
    let err = AppConfig::from_figment(
        &figment()
            .merge(("cloudinary.cloud_name", "demo"))
            .merge(("cloudinary.upload_preset", " ")),
    )
    .unwrap_err();
    assert!(err.to_string().contains("upload_preset"));
}

#[test]
fn unknown_backend_is_a_config_error() {
    let err = AppConfig::from_figment(&figment().merge(("backend", "firebase"))).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}
