#[macro_use]
extern crate rocket;

mod aggregate;
mod config;
mod db;
mod error;
mod export;
mod models;
mod receipts;
mod remote;
mod store;

use chrono::{Datelike, Local};
use config::{AppConfig, ReceiptLimits};
use error::AppError;
use models::{Category, NewCategory, NewTransaction, Profile, Session, Transaction, TransactionEdit, TxKind};
use receipts::ImageHost;
use rocket::figment::Figment;
use rocket::form::Form;
use rocket::fs::{FileServer, TempFile};
use rocket::http::{Cookie, CookieJar, Header, SameSite, Status};
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::tokio::io::AsyncReadExt;
use rocket::{Build, Rocket, State};
use rocket_dyn_templates::Template;
use store::Backend;

const SESSION_COOKIE: &str = "session";

#[derive(FromForm)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(FromForm)]
struct RegisterForm {
    nama: String,
    email: String,
    password: String,
}

#[derive(FromForm)]
struct TransactionForm<'r> {
    #[field(name = "type")]
    kind: String,
    date: String,
    category: String,
    amount: String,
    description: Option<String>,
    receipt: Option<TempFile<'r>>,
    back: Option<String>,
}

#[derive(FromForm)]
struct TransactionEditForm {
    date: String,
    category: String,
    amount: String,
    description: Option<String>,
    month: Option<String>,
    summary: Option<String>,
}

#[derive(FromForm)]
struct MonthForm {
    month: Option<String>,
    summary: Option<String>,
}

#[derive(FromForm)]
struct CategoryForm {
    name: String,
    #[field(name = "type")]
    kind: String,
}

#[derive(FromForm)]
struct CategoryRenameForm {
    name: String,
}

#[derive(Serialize)]
struct Notice {
    form: String,
    ok: bool,
    message: String,
}

#[derive(Serialize)]
struct CategoryView {
    id: String,
    name: String,
    kind: &'static str,
    editing: bool,
}

#[derive(Serialize)]
struct CategoryGroup {
    kind: &'static str,
    names: Vec<String>,
}

#[derive(Serialize)]
struct TransactionView {
    id: String,
    date: String,
    date_label: String,
    category: String,
    amount: i64,
    amount_label: String,
    description: String,
    kind: &'static str,
    income: bool,
    receipt_url: Option<String>,
    editing: bool,
}

#[derive(Serialize)]
struct MonthOption {
    key: String,
    label: String,
}

#[derive(Serialize)]
struct MonthRow {
    label: String,
    income: String,
    expense: String,
    net: String,
}

#[derive(Serialize)]
struct SliceView {
    name: String,
    amount: String,
    share: f64,
}

#[derive(Responder)]
#[response(content_type = "text/csv")]
struct CsvDownload {
    body: Vec<u8>,
    disposition: Header<'static>,
}

fn today_ymd() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn notice(redirect: Redirect, form: &str, ok: bool, message: impl Into<String>) -> Flash<Redirect> {
    let status = if ok { "success" } else { "error" };
    Flash::new(redirect, format!("{form}:{status}"), message.into())
}

fn notice_view(flash: Option<FlashMessage<'_>>) -> Option<Notice> {
    let flash = flash?;
    let (form, status) = flash.kind().split_once(':').unwrap_or(("", flash.kind()));
    Some(Notice {
        form: form.to_string(),
        ok: status == "success",
        message: flash.message().to_string(),
    })
}

fn set_session_cookie(cookies: &CookieJar<'_>, token: String) {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookies.add(cookie);
}

fn remove_session_cookie(cookies: &CookieJar<'_>) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
}

fn session_token(cookies: &CookieJar<'_>) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

async fn require_session(backend: &Backend, cookies: &CookieJar<'_>) -> Result<Session, Redirect> {
    let Some(token) = session_token(cookies) else {
        return Err(Redirect::to(uri!(login_page)));
    };
    match backend.current_user(&token).await {
        Ok(Some(user)) => Ok(Session { token, user }),
        Ok(None) => {
            remove_session_cookie(cookies);
            Err(Redirect::to(uri!(login_page)))
        }
        Err(err) => {
            tracing::warn!(error = %err, "session lookup failed");
            Err(Redirect::to(uri!(login_page)))
        }
    }
}

/// Read failures on page loads leave the list empty and surface the message.
fn or_empty<T>(result: Result<Vec<T>, AppError>, problems: &mut Vec<String>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "page data load failed");
        problems.push(err.to_string());
        Vec::new()
    })
}

async fn display_name(backend: &Backend, session: &Session) -> String {
    match backend.profile(session).await {
        Ok(Some(profile)) if !profile.name.trim().is_empty() => profile.name,
        Ok(_) => session.user.email.clone(),
        Err(err) => {
            tracing::warn!(error = %err, "profile load failed");
            session.user.email.clone()
        }
    }
}

fn category_groups(categories: &[Category]) -> Vec<CategoryGroup> {
    TxKind::ALL
        .into_iter()
        .map(|kind| CategoryGroup {
            kind: kind.as_str(),
            names: categories
                .iter()
                .filter(|category| category.kind == kind)
                .map(|category| category.name.clone())
                .collect(),
        })
        .collect()
}

fn category_view(category: &Category, editing: Option<&str>) -> CategoryView {
    CategoryView {
        id: category.id.clone(),
        name: category.name.clone(),
        kind: category.kind.as_str(),
        editing: editing == Some(category.id.as_str()),
    }
}

fn transaction_view(tx: &Transaction, editing: Option<&str>) -> TransactionView {
    TransactionView {
        id: tx.id.clone(),
        date: tx.date.clone(),
        date_label: aggregate::date_label(&tx.date),
        category: tx.category.clone(),
        amount: tx.amount,
        amount_label: aggregate::format_rupiah(tx.amount),
        description: tx.description.clone().unwrap_or_default(),
        kind: tx.kind.as_str(),
        income: tx.kind == TxKind::Income,
        receipt_url: tx.receipt_url.clone().filter(|url| !url.is_empty()),
        editing: editing == Some(tx.id.as_str()),
    }
}

// Embedded inside a <script> tag, so `<` must not appear literally.
fn script_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json.replace('<', "\\u003c"),
        Err(err) => {
            tracing::warn!(error = %err, "chart payload serialization failed");
            "{}".to_string()
        }
    }
}

fn back_to(back: Option<&str>) -> Redirect {
    match back {
        Some("dashboard") => Redirect::to(uri!(dashboard(_, _, _))),
        _ => Redirect::to(uri!(home(_))),
    }
}

fn dashboard_at(month: Option<&str>, summary: Option<&str>) -> Redirect {
    Redirect::to(uri!(dashboard(month = month, summary = summary, edit = _)))
}

fn render_login(error: Option<&str>, notice: Option<Notice>, email: &str) -> Template {
    Template::render(
        "login",
        serde_json::json!({
            "error": error,
            "notice": notice,
            "email": email,
        }),
    )
}

fn render_register(error: Option<&str>, nama: &str, email: &str) -> Template {
    Template::render(
        "register",
        serde_json::json!({
            "error": error,
            "nama": nama,
            "email": email,
        }),
    )
}

#[get("/login")]
async fn login_page(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    flash: Option<FlashMessage<'_>>,
) -> Result<Template, Redirect> {
    if let Some(token) = session_token(cookies) {
        if let Ok(Some(_)) = backend.current_user(&token).await {
            return Err(Redirect::to(uri!(home(_))));
        }
    }
    Ok(render_login(None, notice_view(flash), ""))
}

#[post("/login", data = "<form>")]
async fn login_submit(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    form: Form<LoginForm>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(render_login(Some("Email dan password wajib diisi"), None, &form.email));
    }
    match backend.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            tracing::info!(user = %session.user.id, "signed in");
            set_session_cookie(cookies, session.token);
            Ok(Redirect::to(uri!(home(_))))
        }
        Err(err) => {
            tracing::warn!(error = %err, "sign-in failed");
            Err(render_login(Some(&err.to_string()), None, &form.email))
        }
    }
}

#[get("/register")]
fn register_page() -> Template {
    render_register(None, "", "")
}

#[post("/register", data = "<form>")]
async fn register_submit(
    backend: &State<Backend>,
    form: Form<RegisterForm>,
) -> Result<Flash<Redirect>, Template> {
    let form = form.into_inner();
    let nama = form.nama.trim();
    if nama.is_empty() {
        return Err(render_register(Some("Nama wajib diisi"), nama, &form.email));
    }
    let registration = backend
        .sign_up(&form.email, &form.password)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "sign-up failed");
            render_register(Some(&err.to_string()), nama, &form.email)
        })?;
    tracing::info!(user = %registration.user.id, "registered");

    let profile = Profile {
        id: registration.user.id.clone(),
        name: nama.to_string(),
    };
    if let Err(err) = backend
        .insert_profile(registration.access_token.as_deref(), &profile)
        .await
    {
        tracing::warn!(error = %err, user = %profile.id, "profile insert failed");
    }

    Ok(notice(
        Redirect::to(uri!(login_page)),
        "login",
        true,
        "Registrasi berhasil!",
    ))
}

#[get("/logout")]
async fn logout(backend: &State<Backend>, cookies: &CookieJar<'_>) -> Redirect {
    if let Some(token) = session_token(cookies) {
        if let Err(err) = backend.sign_out(&token).await {
            tracing::warn!(error = %err, "sign-out failed");
        }
    }
    remove_session_cookie(cookies);
    Redirect::to(uri!(login_page))
}

#[get("/?<edit_category>")]
async fn home(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    flash: Option<FlashMessage<'_>>,
    edit_category: Option<String>,
) -> Result<Template, Redirect> {
    let session = require_session(backend, cookies).await?;
    let name = display_name(backend, &session).await;
    let mut problems = Vec::new();
    let categories = or_empty(backend.list_categories(&session).await, &mut problems);
    let rows: Vec<CategoryView> = categories
        .iter()
        .map(|category| category_view(category, edit_category.as_deref()))
        .collect();

    let context = serde_json::json!({
        "name": name,
        "today": today_ymd(),
        "kinds": TxKind::ALL.map(TxKind::as_str),
        "groups": category_groups(&categories),
        "categories": rows,
        "notice": notice_view(flash),
        "problem": problems.first(),
        "back": "home",
    });
    Ok(Template::render("home", &context))
}

async fn read_upload(file: &TempFile<'_>) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    reader.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

async fn upload_receipt(
    host: &ImageHost,
    limits: ReceiptLimits,
    file: &TempFile<'_>,
) -> Result<String, AppError> {
    let bytes = read_upload(file).await?;
    let image =
        rocket::tokio::task::spawn_blocking(move || receipts::compress(&bytes, limits)).await??;
    host.upload(image).await
}

/// A name the user only keeps under the other kind cannot be used. Names
/// that are not in the category list at all are accepted.
fn category_fits(categories: &[Category], name: &str, kind: TxKind) -> bool {
    let mut named = categories.iter().filter(|category| category.name == name).peekable();
    named.peek().is_none() || named.any(|category| category.kind == kind)
}

async fn create_transaction(
    backend: &Backend,
    host: &ImageHost,
    limits: ReceiptLimits,
    session: &Session,
    form: TransactionForm<'_>,
) -> Result<(), AppError> {
    let kind = TxKind::parse(&form.kind)
        .ok_or_else(|| AppError::validation("Jenis transaksi tidak valid"))?;
    let date = form.date.trim();
    if date.is_empty() {
        return Err(AppError::validation("Tanggal wajib diisi"));
    }
    let category = form.category.trim();
    if category.is_empty() {
        return Err(AppError::validation("Kategori wajib dipilih"));
    }
    let amount = aggregate::parse_nominal(&form.amount)
        .ok_or_else(|| AppError::validation("Nominal harus berupa angka"))?;
    let categories = backend.list_categories(session).await?;
    if !category_fits(&categories, category, kind) {
        return Err(AppError::validation("Kategori tidak sesuai dengan jenis transaksi"));
    }

    // An upload failure aborts the whole submission.
    let receipt_url = match &form.receipt {
        Some(file) if file.len() > 0 => Some(upload_receipt(host, limits, file).await?),
        _ => None,
    };

    let tx = NewTransaction {
        date: date.to_string(),
        category: category.to_string(),
        amount,
        description: non_empty(form.description),
        user_id: session.user.id.clone(),
        kind,
        receipt_url,
    };
    backend.insert_transaction(session, &tx).await?;
    tracing::info!(user = %session.user.id, kind = kind.as_str(), amount, "transaction added");
    Ok(())
}

#[post("/transactions", data = "<form>")]
async fn add_transaction(
    backend: &State<Backend>,
    host: &State<ImageHost>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
    form: Form<TransactionForm<'_>>,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let form = form.into_inner();
    let back = back_to(form.back.as_deref());
    match create_transaction(backend, host, config.receipt_limits(), &session, form).await {
        Ok(()) => Ok(notice(back, "transaction", true, "Transaksi berhasil ditambahkan!")),
        Err(err) => {
            tracing::warn!(error = %err, "transaction insert failed");
            Ok(notice(back, "transaction", false, err.to_string()))
        }
    }
}

fn transaction_edit(form: TransactionEditForm) -> Result<TransactionEdit, AppError> {
    let date = form.date.trim();
    if date.is_empty() {
        return Err(AppError::validation("Tanggal wajib diisi"));
    }
    let category = form.category.trim();
    if category.is_empty() {
        return Err(AppError::validation("Kategori wajib dipilih"));
    }
    let amount = aggregate::parse_nominal(&form.amount)
        .ok_or_else(|| AppError::validation("Nominal harus berupa angka"))?;
    Ok(TransactionEdit {
        date: date.to_string(),
        category: category.to_string(),
        amount,
        description: non_empty(form.description),
    })
}

#[post("/transactions/<id>", data = "<form>")]
async fn edit_transaction(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    id: &str,
    form: Form<TransactionEditForm>,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let mut form = form.into_inner();
    let month = non_empty(form.month.take());
    let summary = non_empty(form.summary.take());
    let back = dashboard_at(month.as_deref(), summary.as_deref());

    let result = match transaction_edit(form) {
        Ok(edit) => backend.update_transaction(&session, id, &edit).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => Ok(notice(back, "table", true, "Transaksi berhasil diubah!")),
        Err(err) => {
            tracing::warn!(error = %err, %id, "transaction update failed");
            Ok(notice(back, "table", false, err.to_string()))
        }
    }
}

#[post("/transactions/<id>/delete", data = "<form>")]
async fn delete_transaction(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    id: &str,
    form: Form<MonthForm>,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let form = form.into_inner();
    let month = non_empty(form.month);
    let summary = non_empty(form.summary);
    let back = dashboard_at(month.as_deref(), summary.as_deref());
    match backend.delete_transaction(&session, id).await {
        Ok(()) => Ok(notice(back, "table", true, "Transaksi berhasil dihapus!")),
        Err(err) => {
            tracing::warn!(error = %err, %id, "transaction delete failed");
            Ok(notice(back, "table", false, err.to_string()))
        }
    }
}

#[post("/categories", data = "<form>")]
async fn add_category(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    form: Form<CategoryForm>,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let back = Redirect::to(uri!(home(_)));
    let form = form.into_inner();
    let name = form.name.trim();
    if name.is_empty() {
        return Ok(notice(back, "category", false, "Nama kategori tidak boleh kosong"));
    }
    let Some(kind) = TxKind::parse(&form.kind) else {
        return Ok(notice(back, "category", false, "Jenis kategori tidak valid"));
    };

    let category = NewCategory {
        name: name.to_string(),
        kind,
        user_id: session.user.id.clone(),
    };
    match backend.insert_category(&session, &category).await {
        Ok(()) => Ok(notice(back, "category", true, "Kategori berhasil ditambah!")),
        Err(err) => {
            tracing::warn!(error = %err, "category insert failed");
            Ok(notice(back, "category", false, err.to_string()))
        }
    }
}

#[post("/categories/<id>", data = "<form>")]
async fn rename_category(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    id: &str,
    form: Form<CategoryRenameForm>,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let name = form.name.trim();
    if name.is_empty() {
        return Ok(notice(
            Redirect::to(uri!(home(edit_category = Some(id)))),
            "category-list",
            false,
            "Nama kategori tidak boleh kosong",
        ));
    }
    let back = Redirect::to(uri!(home(_)));
    match backend.rename_category(&session, id, name).await {
        Ok(()) => Ok(notice(back, "category-list", true, "Kategori berhasil diubah!")),
        Err(err) => {
            tracing::warn!(error = %err, %id, "category rename failed");
            Ok(notice(back, "category-list", false, err.to_string()))
        }
    }
}

#[post("/categories/<id>/delete")]
async fn delete_category(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    id: &str,
) -> Result<Flash<Redirect>, Redirect> {
    let session = require_session(backend, cookies).await?;
    let back = Redirect::to(uri!(home(_)));
    match backend.delete_category(&session, id).await {
        Ok(()) => Ok(notice(back, "category-list", true, "Kategori berhasil dihapus!")),
        Err(err) => {
            tracing::warn!(error = %err, %id, "category delete failed");
            Ok(notice(back, "category-list", false, err.to_string()))
        }
    }
}

#[get("/dashboard?<month>&<summary>&<edit>")]
async fn dashboard(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    flash: Option<FlashMessage<'_>>,
    month: Option<String>,
    summary: Option<String>,
    edit: Option<String>,
) -> Result<Template, Redirect> {
    let session = require_session(backend, cookies).await?;
    let name = display_name(backend, &session).await;
    let mut problems = Vec::new();
    let transactions = or_empty(backend.list_transactions(&session).await, &mut problems);
    let categories = or_empty(backend.list_categories(&session).await, &mut problems);

    let month = aggregate::normalize_month(month.as_deref());
    let summary = aggregate::normalize_month(summary.as_deref());
    let monthly = aggregate::monthly_totals(&transactions);
    let balance = aggregate::balance(&transactions, summary);
    let charts = aggregate::chart_data(&transactions, summary, Local::now().year());

    let month_options: Vec<MonthOption> = monthly
        .keys()
        .map(|key| MonthOption {
            key: key.clone(),
            label: aggregate::month_label(key),
        })
        .collect();
    let month_rows: Vec<MonthRow> = monthly
        .iter()
        .map(|(key, totals)| MonthRow {
            label: aggregate::month_label(key),
            income: aggregate::format_compact(totals.income),
            expense: aggregate::format_compact(totals.expense),
            net: aggregate::format_rupiah(totals.net()),
        })
        .collect();
    let slices: Vec<SliceView> = charts
        .categories
        .iter()
        .map(|slice| SliceView {
            name: slice.name.clone(),
            amount: aggregate::format_rupiah(slice.amount),
            share: slice.share,
        })
        .collect();
    let rows: Vec<TransactionView> = aggregate::filter_by_month(&transactions, month)
        .into_iter()
        .map(|tx| transaction_view(tx, edit.as_deref()))
        .collect();
    let mut category_names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    category_names.sort_unstable();
    category_names.dedup();

    let context = serde_json::json!({
        "name": name,
        "today": today_ymd(),
        "month": month,
        "summary": summary,
        "month_label": month.map(aggregate::month_label),
        "summary_label": summary.map(aggregate::month_label),
        "months": month_options,
        "month_rows": month_rows,
        "balance": {
            "remaining": aggregate::format_rupiah(balance.remaining),
            "income": aggregate::format_rupiah(balance.income),
            "expense": aggregate::format_rupiah(balance.expense),
        },
        "slices": slices,
        "charts": script_json(&charts),
        "transactions": rows,
        "category_names": category_names,
        "kinds": TxKind::ALL.map(TxKind::as_str),
        "groups": category_groups(&categories),
        "notice": notice_view(flash),
        "problem": problems.first(),
        "back": "dashboard",
    });
    Ok(Template::render("dashboard", &context))
}

#[get("/dashboard/export?<month>")]
async fn export_csv(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
) -> Result<CsvDownload, Flash<Redirect>> {
    let session = require_session(backend, cookies)
        .await
        .map_err(|redirect| notice(redirect, "login", false, "Silakan login terlebih dahulu"))?;
    let month = aggregate::normalize_month(month.as_deref());
    let failed = |err: AppError| {
        tracing::warn!(error = %err, "csv export failed");
        notice(dashboard_at(month, None), "table", false, err.to_string())
    };

    let transactions = backend.list_transactions(&session).await.map_err(&failed)?;
    let body = export::transactions_csv(aggregate::filter_by_month(&transactions, month))
        .map_err(&failed)?;
    let filename = export::export_filename(month);
    Ok(CsvDownload {
        body,
        disposition: Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ),
    })
}

#[get("/api/charts?<month>&<year>")]
async fn charts_api(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
    year: Option<i32>,
) -> Result<Json<aggregate::ChartData>, Status> {
    let session = require_session(backend, cookies)
        .await
        .map_err(|_| Status::Unauthorized)?;
    let transactions = backend.list_transactions(&session).await.map_err(|err| {
        tracing::warn!(error = %err, "chart data load failed");
        Status::BadGateway
    })?;
    let month = aggregate::normalize_month(month.as_deref());
    let year = year.unwrap_or_else(|| Local::now().year());
    Ok(Json(aggregate::chart_data(&transactions, month, year)))
}

#[get("/api/transactions?<month>")]
async fn transactions_api(
    backend: &State<Backend>,
    cookies: &CookieJar<'_>,
    month: Option<String>,
) -> Result<Json<Vec<Transaction>>, Status> {
    let session = require_session(backend, cookies)
        .await
        .map_err(|_| Status::Unauthorized)?;
    let transactions = backend.list_transactions(&session).await.map_err(|err| {
        tracing::warn!(error = %err, "transaction list load failed");
        Status::BadGateway
    })?;
    let month = aggregate::normalize_month(month.as_deref());
    Ok(Json(
        aggregate::filter_by_month(&transactions, month)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

fn build_rocket(figment: Figment) -> Result<Rocket<Build>, AppError> {
    let config = AppConfig::from_figment(&figment)?;
    let backend = Backend::connect(&config)?;
    let host = ImageHost::from_config(&config)?;
    tracing::info!(
        backend = backend.name(),
        data_dir = %config.data_dir.display(),
        "storage ready"
    );

    let receipts_dir = host.local_dir().map(|dir| dir.to_path_buf());
    let mut rocket = rocket::custom(figment)
        .manage(backend)
        .manage(host)
        .manage(config)
        .mount(
            "/",
            routes![
                login_page,
                login_submit,
                register_page,
                register_submit,
                logout,
                home,
                add_transaction,
                edit_transaction,
                delete_transaction,
                add_category,
                rename_category,
                delete_category,
                dashboard,
                export_csv,
                charts_api,
                transactions_api
            ],
        )
        .mount("/static", FileServer::from("static"))
        .attach(Template::fairing());
    if let Some(dir) = receipts_dir {
        rocket = rocket.mount("/receipts", FileServer::from(dir));
    }
    Ok(rocket)
}

#[rocket::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let rocket = match build_rocket(rocket::Config::figment()) {
        Ok(rocket) => rocket,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };
    if let Err(err) = rocket.launch().await {
        tracing::error!(error = %err, "server stopped");
        std::process::exit(1);
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
