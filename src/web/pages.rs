use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};

/// One shared shell for every navigable path. The client script takes
/// over after load; the server only has to answer the known routes.
fn page(title: &str) -> Html<String> {
    Html(format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"ja\">\n",
            "<head>\n",
            "  <meta charset=\"utf-8\">\n",
            "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "  <title>{title}</title>\n",
            "</head>\n",
            "<body>\n",
            "  <div id=\"root\">\n",
            "    <main><h1>{title}</h1></main>\n",
            "  </div>\n",
            "</body>\n",
            "</html>\n",
        ),
        title = title
    ))
}

pub async fn home() -> Html<String> {
    page("ホーム")
}

pub async fn platform() -> Html<String> {
    page("プラットフォーム")
}

pub async fn solutions() -> Html<String> {
    page("ソリューション")
}

pub async fn case_studies() -> Html<String> {
    page("導入事例")
}

pub async fn company() -> Html<String> {
    page("会社情報")
}

/// The vision page moved into the company page; the old path stays as a
/// permanent redirect.
pub async fn vision() -> Redirect {
    Redirect::permanent("/company#vision")
}

pub async fn contact() -> Html<String> {
    page("お問い合わせ")
}

pub async fn rfi() -> Html<String> {
    page("資料請求")
}

pub async fn news_index() -> Html<String> {
    page("ニュース")
}

pub async fn news_detail(Path(_id): Path<String>) -> Html<String> {
    page("ニュース詳細")
}

pub async fn admin_news() -> Html<String> {
    page("ニュース管理")
}

pub async fn chat() -> Html<String> {
    page("チャット")
}

pub async fn workshop() -> Html<String> {
    page("ワークショップ")
}

pub async fn seminar() -> Html<String> {
    page("セミナー")
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, page("ページが見つかりません"))
}
