use super::*;
use rocket::http::ContentType;
use rocket::local::blocking::{Client, LocalResponse};

fn client() -> Client {
    let dir = std::env::temp_dir().join(format!("uang-sakti-app-{}", uuid::Uuid::new_v4()));
    let figment = rocket::Config::figment()
        .merge(("data_dir", &dir))
        .merge(("log_level", "off"));
    Client::tracked(build_rocket(figment).unwrap()).unwrap()
}

fn location(response: &LocalResponse<'_>) -> Option<String> {
    response.headers().get_one("Location").map(str::to_string)
}

fn post_form<'c>(client: &'c Client, path: impl Into<String>, body: &str) -> LocalResponse<'c> {
    client
        .post(path.into())
        .header(ContentType::Form)
        .body(body)
        .dispatch()
}

fn signed_in_client() -> Client {
    let client = client();
    let response = post_form(
        &client,
        "/register",
        "nama=Budi&email=budi%40example.com&password=rahasia1",
    );
    assert_eq!(response.status(), Status::SeeOther);
    drop(response);
    let response = post_form(&client, "/login", "email=budi%40example.com&password=rahasia1");
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/"));
    drop(response);
    client
}

fn transactions(client: &Client, query: &str) -> Vec<serde_json::Value> {
    let response = client.get(format!("/api/transactions{query}")).dispatch();
    assert_eq!(response.status(), Status::Ok);
    response.into_json().unwrap()
}

/// Pulls the first `<prefix><id><suffix>` id out of rendered html.
fn id_between(body: &str, prefix: &str, suffix: &str) -> String {
    let start = body.find(prefix).unwrap() + prefix.len();
    let len = body[start..].find(suffix).unwrap();
    body[start..start + len].to_string()
}

fn tiny_png() -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(16, 16, image::Rgb([200, 40, 40]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(pixels)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

#[test]
fn pages_require_a_session() {
    let client = client();
    for path in ["/", "/dashboard", "/dashboard?month=2024-01"] {
        let response = client.get(path).dispatch();
        assert_eq!(response.status(), Status::SeeOther, "{path}");
        assert_eq!(location(&response).as_deref(), Some("/login"), "{path}");
    }
    assert_eq!(client.get("/api/charts").dispatch().status(), Status::Unauthorized);
    assert_eq!(client.get("/login").dispatch().status(), Status::Ok);
    assert_eq!(client.get("/register").dispatch().status(), Status::Ok);

    let response = post_form(&client, "/categories", "name=Makan&type=Pengeluaran");
    assert_eq!(location(&response).as_deref(), Some("/login"));
}

#[test]
fn register_then_login() {
    let client = client();
    let response = post_form(
        &client,
        "/register",
        "nama=Budi&email=budi%40example.com&password=rahasia1",
    );
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/login"));
    let page = client.get("/login").dispatch().into_string().unwrap();
    assert!(page.contains("Registrasi berhasil!"));

    let page = post_form(
        &client,
        "/register",
        "nama=Budi&email=budi%40example.com&password=rahasia1",
    )
    .into_string()
    .unwrap();
    assert!(page.contains("User already registered"));

    let page = post_form(&client, "/login", "email=budi%40example.com&password=salah123")
        .into_string()
        .unwrap();
    assert!(page.contains("Invalid login credentials"));

    let response = post_form(&client, "/login", "email=budi%40example.com&password=rahasia1");
    assert_eq!(location(&response).as_deref(), Some("/"));
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Budi"));

    let response = client.get("/logout").dispatch();
    assert_eq!(location(&response).as_deref(), Some("/login"));
    assert_eq!(client.get("/").dispatch().status(), Status::SeeOther);
}

#[test]
fn categories_are_added_renamed_and_deleted() {
    let client = signed_in_client();

    let response = post_form(&client, "/categories", "name=Makan&type=Pengeluaran");
    assert_eq!(location(&response).as_deref(), Some("/"));
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Kategori berhasil ditambah!"));
    assert!(home.contains("Makan"));

    let id = id_between(&home, "action=\"/categories/", "/delete\"");

    let response = post_form(&client, format!("/categories/{id}"), "name=++");
    assert_eq!(
        location(&response),
        Some(format!("/?edit_category={id}"))
    );
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Nama kategori tidak boleh kosong"));

    post_form(&client, format!("/categories/{id}"), "name=Makanan");
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Kategori berhasil diubah!"));
    assert!(home.contains("Makanan"));

    client.post(format!("/categories/{id}/delete")).dispatch();
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Kategori berhasil dihapus!"));
    assert!(!home.contains("Makanan"));
}

#[test]
fn transactions_feed_the_dashboard() {
    let client = signed_in_client();

    let response = post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=Rp.+50.000&description=Warung&back=dashboard",
    );
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));

    let response = post_form(
        &client,
        "/transactions",
        "type=Pemasukan&date=2024-01-10&category=Gaji&amount=2.000.000&back=home",
    );
    assert_eq!(location(&response).as_deref(), Some("/"));
    post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-02-01&category=Listrik&amount=150000",
    );

    let page = client.get("/dashboard").dispatch().into_string().unwrap();
    assert!(page.contains("Transaksi berhasil ditambahkan!"));
    assert!(page.contains("5 Januari 2024"));
    assert!(page.contains("Rp 50.000"));
    assert!(page.contains("Rp 1.800.000"));
    assert!(page.contains("Januari 2024"));
    assert!(page.contains("Februari 2024"));

    let january = client
        .get("/dashboard?summary=2024-01&month=2024-01")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(january.contains("Rp 1.950.000"));
    assert!(!january.contains("Listrik"));

    let listed = transactions(&client, "?month=2024-01");
    assert_eq!(listed.len(), 2);
    assert_eq!(transactions(&client, "").len(), 3);
}

#[test]
fn invalid_transactions_are_rejected_with_a_message() {
    let client = signed_in_client();
    let response = post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=abc",
    );
    assert_eq!(location(&response).as_deref(), Some("/"));
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Nominal harus berupa angka"));

    post_form(
        &client,
        "/transactions",
        "type=Lainnya&date=2024-01-05&category=Makan&amount=1000",
    );
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Jenis transaksi tidak valid"));
    assert!(transactions(&client, "").is_empty());
}

#[test]
fn transactions_are_edited_and_deleted() {
    let client = signed_in_client();
    post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=50000&description=Warung",
    );
    let id = transactions(&client, "")[0]["id"].as_str().unwrap().to_string();

    let response = post_form(
        &client,
        format!("/transactions/{id}"),
        "date=2024-01-06&category=Makan&amount=45.000&description=&month=2024-01",
    );
    assert_eq!(location(&response).as_deref(), Some("/dashboard?month=2024-01"));
    let edited = transactions(&client, "");
    assert_eq!(edited[0]["amount"], 45000);
    assert_eq!(edited[0]["date"], "2024-01-06");
    assert!(edited[0]["description"].is_null());

    let page = client.get(format!("/dashboard?edit={id}")).dispatch().into_string().unwrap();
    assert!(page.contains("Transaksi berhasil diubah!"));
    assert!(page.contains("Simpan"));

    let response = post_form(&client, format!("/transactions/{id}/delete"), "month=");
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));
    assert!(transactions(&client, "").is_empty());
}

#[test]
fn category_of_the_other_type_is_refused() {
    let client = signed_in_client();
    post_form(&client, "/categories", "name=Gaji&type=Pemasukan");
    post_form(&client, "/categories", "name=Makan&type=Pengeluaran");

    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains(r#"data-kind="Pemasukan""#));
    assert!(home.contains(r#"data-kind="Pengeluaran""#));
    assert!(home.contains("/static/transaction_form.js"));

    let response = post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Gaji&amount=1000",
    );
    assert_eq!(location(&response).as_deref(), Some("/"));
    let home = client.get("/").dispatch().into_string().unwrap();
    assert!(home.contains("Kategori tidak sesuai dengan jenis transaksi"));
    assert!(transactions(&client, "").is_empty());

    post_form(
        &client,
        "/transactions",
        "type=Pemasukan&date=2024-01-05&category=Gaji&amount=1000",
    );
    post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-06&category=Bensin&amount=2000",
    );
    assert_eq!(transactions(&client, "").len(), 2);
}

#[test]
fn table_actions_keep_the_summary_month() {
    let client = signed_in_client();
    post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=50000",
    );
    let id = transactions(&client, "")[0]["id"].as_str().unwrap().to_string();

    let page = client
        .get("/dashboard?month=2024-01&summary=2024-02")
        .dispatch()
        .into_string()
        .unwrap();
    assert!(page.contains(&format!(
        r#"href="/dashboard?edit={id}&month=2024-01&summary=2024-02""#
    )));

    let page = client
        .get(format!("/dashboard?edit={id}&month=2024-01&summary=2024-02"))
        .dispatch()
        .into_string()
        .unwrap();
    assert!(page.contains(r#"href="/dashboard?month=2024-01&summary=2024-02">Batal"#));
    assert!(page.contains(r#"name="summary" value="2024-02""#));

    let response = post_form(
        &client,
        format!("/transactions/{id}"),
        "date=2024-01-06&category=Makan&amount=45000&month=2024-01&summary=2024-02",
    );
    assert_eq!(
        location(&response).as_deref(),
        Some("/dashboard?month=2024-01&summary=2024-02")
    );

    let response = post_form(
        &client,
        format!("/transactions/{id}/delete"),
        "month=&summary=2024-02",
    );
    assert_eq!(location(&response).as_deref(), Some("/dashboard?summary=2024-02"));
}

#[test]
fn export_downloads_filtered_csv() {
    let client = signed_in_client();
    post_form(
        &client,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Food&amount=50000",
    );
    post_form(
        &client,
        "/transactions",
        "type=Pemasukan&date=2024-02-05&category=Gaji&amount=1000000",
    );

    let response = client.get("/dashboard/export?month=2024-01").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response.content_type().unwrap().is_csv());
    assert_eq!(
        response.headers().get_one("Content-Disposition"),
        Some("attachment; filename=\"transaksi-2024-01.csv\"")
    );
    let body = response.into_string().unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#""Tanggal","Kategori","Deskripsi","Nominal","Jenis","Bukti""#,
            r#""2024-01-05","Food","","50000","Pengeluaran","""#,
        ]
    );

    let response = client.get("/dashboard/export").dispatch();
    assert_eq!(
        response.headers().get_one("Content-Disposition"),
        Some("attachment; filename=\"transaksi-semua.csv\"")
    );
    assert_eq!(response.into_string().unwrap().lines().count(), 3);
}

#[test]
fn chart_api_shapes_monthly_and_category_series() {
    let client = signed_in_client();
    for body in [
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=30000",
        "type=Pengeluaran&date=2024-01-07&category=Transport&amount=10000",
        "type=Pemasukan&date=2024-01-10&category=Gaji&amount=2000000",
        "type=Pengeluaran&date=2023-12-30&category=Makan&amount=5000",
    ] {
        post_form(&client, "/transactions", body);
    }

    let response = client.get("/api/charts?month=2024-01&year=2024").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let charts: serde_json::Value = response.into_json().unwrap();
    assert_eq!(charts["months"], serde_json::json!(["2023-12", "2024-01"]));
    assert_eq!(charts["labels"], serde_json::json!(["Desember 2023", "Januari 2024"]));
    assert_eq!(charts["income"], serde_json::json!([0, 2000000]));
    assert_eq!(charts["expense"], serde_json::json!([5000, 40000]));
    assert_eq!(charts["net"], serde_json::json!([-5000, 1960000]));
    let slices = charts["categories"].as_array().unwrap();
    assert_eq!(slices.len(), 2);
    let share = |name: &str| {
        slices
            .iter()
            .find(|slice| slice["name"] == name)
            .map(|slice| slice["share"].as_f64().unwrap())
    };
    assert_eq!(share("Makan"), Some(75.0));
    assert_eq!(share("Transport"), Some(25.0));
    assert_eq!(charts["year_income"][0], 2000000);
    assert_eq!(charts["year_expense"][11], 0);
}

#[test]
fn receipt_upload_is_stored_and_served() {
    let client = signed_in_client();
    let boundary = "uangsaktiboundary";
    let mut body = Vec::new();
    for (name, value) in [
        ("type", "Pengeluaran"),
        ("date", "2024-01-05"),
        ("category", "Makan"),
        ("amount", "25000"),
        ("back", "dashboard"),
    ] {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let png = tiny_png();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"receipt\"; filename=\"nota.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(&png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = client
        .post("/transactions")
        .header(ContentType::new("multipart", "form-data").with_params(("boundary", boundary)))
        .body(body)
        .dispatch();
    assert_eq!(location(&response).as_deref(), Some("/dashboard"));

    let listed = transactions(&client, "");
    let url = listed[0]["bukti_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/receipts/receipt-"));
    let served = client.get(url).dispatch();
    assert_eq!(served.status(), Status::Ok);
    assert_eq!(served.into_bytes().unwrap(), png);
}

#[test]
fn rows_are_scoped_to_the_signed_in_user() {
    let budi = signed_in_client();
    post_form(
        &budi,
        "/transactions",
        "type=Pengeluaran&date=2024-01-05&category=Makan&amount=50000",
    );
    let id = transactions(&budi, "")[0]["id"].as_str().unwrap().to_string();

    // Second account on the same store, same cookie jar.
    let response = post_form(
        &budi,
        "/register",
        "nama=Siti&email=siti%40example.com&password=rahasia2",
    );
    assert_eq!(response.status(), Status::SeeOther);
    post_form(&budi, "/login", "email=siti%40example.com&password=rahasia2");

    assert!(transactions(&budi, "").is_empty());
    post_form(&budi, format!("/transactions/{id}/delete"), "");

    post_form(&budi, "/login", "email=budi%40example.com&password=rahasia1");
    assert_eq!(transactions(&budi, "").len(), 1);
}
