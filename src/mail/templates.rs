use super::OutboundEmail;
use crate::config::Config;
use crate::models::forms::{
    ContactSubmission, RfiSubmission, SeminarSubmission, WorkshopSubmission,
};

/// Notification/confirmation pair produced for one form submission. The
/// notification goes to the staff inbox, the confirmation back to the
/// submitter.
#[derive(Debug, Clone)]
pub struct FormMail {
    pub notification: OutboundEmail,
    pub confirmation: OutboundEmail,
}

/// Escape user input for interpolation into an HTML mail body. `&` must
/// be replaced first.
pub fn html_encode(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn multiline(input: &str) -> String {
    html_encode(input).replace('\n', "<br>")
}

fn row(label: &str, value: &str) -> String {
    format!("<p><strong>{label}:</strong> {value}</p>")
}

fn signature(config: &Config) -> String {
    format!(
        "<p>{}<br>{}</p>",
        html_encode(&config.company_name),
        html_encode(&config.site_url)
    )
}

pub fn contact_mail(form: &ContactSubmission, config: &Config) -> FormMail {
    let company = html_encode(&form.company);
    let department = html_encode(&form.department);
    let name = html_encode(&form.name);
    let email = html_encode(&form.email);
    let message = multiline(&form.message);
    let phone_row = match &form.phone {
        Some(phone) => row("電話番号", &html_encode(phone)),
        None => String::new(),
    };

    let notification = OutboundEmail {
        to: config.notify_email.clone(),
        subject: format!("【お問い合わせ】{} {}様より", form.company, form.name),
        html: format!(
            "<h2>新しいお問い合わせが届きました</h2>\n{}{}{}{}{}\n<p><strong>お問い合わせ内容:</strong></p>\n<p>{}</p>",
            row("会社名", &company),
            row("部署・役職", &department),
            row("お名前", &format!("{name}様")),
            row("メールアドレス", &email),
            phone_row,
            message,
        ),
    };

    let confirmation = OutboundEmail {
        to: form.email.clone(),
        subject: format!("お問い合わせを受け付けました - {}", config.company_name),
        html: format!(
            "<p>{name}様</p>\n<p>この度はお問い合わせいただき、誠にありがとうございます。以下の内容で受け付けました。</p>\n<hr>\n{}{}\n<p><strong>お問い合わせ内容:</strong></p>\n<p>{}</p>\n<hr>\n<p>担当者より2営業日以内にご連絡いたします。</p>\n{}",
            row("会社名", &company),
            row("お名前", &format!("{name}様")),
            message,
            signature(config),
        ),
    };

    FormMail {
        notification,
        confirmation,
    }
}

pub fn rfi_mail(form: &RfiSubmission, config: &Config) -> FormMail {
    let company = html_encode(&form.company);
    let department = html_encode(&form.department);
    let name = html_encode(&form.name);
    let email = html_encode(&form.email);
    let interests = html_encode(&form.interests.join(", "));
    let message_block = match &form.message {
        Some(message) => format!(
            "\n<p><strong>メッセージ:</strong></p>\n<p>{}</p>",
            multiline(message)
        ),
        None => String::new(),
    };

    let notification = OutboundEmail {
        to: config.notify_email.clone(),
        subject: format!("【資料請求】{} {}様より", form.company, form.name),
        html: format!(
            "<h2>新しい資料請求が届きました</h2>\n{}{}{}{}{}{}",
            row("会社名", &company),
            row("部署・役職", &department),
            row("お名前", &format!("{name}様")),
            row("メールアドレス", &email),
            row("ご関心の内容", &interests),
            message_block,
        ),
    };

    let confirmation = OutboundEmail {
        to: form.email.clone(),
        subject: format!("資料請求を受け付けました - {}", config.company_name),
        html: format!(
            "<p>{name}様</p>\n<p>資料請求ありがとうございます。担当者より資料をお送りいたします。</p>\n<hr>\n{}{}\n<hr>\n{}",
            row("会社名", &company),
            row("ご関心の内容", &interests),
            signature(config),
        ),
    };

    FormMail {
        notification,
        confirmation,
    }
}

pub fn workshop_mail(form: &WorkshopSubmission, config: &Config) -> FormMail {
    let company = html_encode(&form.company);
    let department = html_encode(&form.department);
    let name = html_encode(&form.name);
    let email = html_encode(&form.email);
    let phone_row = match &form.phone {
        Some(phone) => row("電話番号", &html_encode(phone)),
        None => String::new(),
    };
    let message_block = match &form.message {
        Some(message) => format!(
            "\n<p><strong>メッセージ:</strong></p>\n<p>{}</p>",
            multiline(message)
        ),
        None => String::new(),
    };

    let notification = OutboundEmail {
        to: config.notify_email.clone(),
        subject: format!("【ワークショップ】新規エントリー: {} {}様", form.company, form.name),
        html: format!(
            "<h2>ワークショップに新しいエントリーが届きました</h2>\n{}{}{}{}{}{}",
            row("会社名", &company),
            row("部署・役職", &department),
            row("お名前", &format!("{name}様")),
            row("メールアドレス", &email),
            phone_row,
            message_block,
        ),
    };

    let confirmation = OutboundEmail {
        to: form.email.clone(),
        subject: "【ワークショップ】エントリーを受け付けました".to_string(),
        html: format!(
            "<p>{name}様</p>\n<p>ワークショップへのエントリーありがとうございます。選考の結果は追ってご連絡いたします。</p>\n{}",
            signature(config),
        ),
    };

    FormMail {
        notification,
        confirmation,
    }
}

pub fn seminar_mail(form: &SeminarSubmission, config: &Config) -> FormMail {
    let name = html_encode(&form.name);
    let email = html_encode(&form.email);
    let message_block = match &form.message {
        Some(message) => format!(
            "\n<p><strong>メッセージ:</strong></p>\n<p>{}</p>",
            multiline(message)
        ),
        None => String::new(),
    };

    let notification = OutboundEmail {
        to: config.notify_email.clone(),
        subject: format!("【セミナー】開催お知らせ登録: {}様", form.name),
        html: format!(
            "<h2>セミナーの開催お知らせ登録が届きました</h2>\n{}{}{}",
            row("お名前", &format!("{name}様")),
            row("メールアドレス", &email),
            message_block,
        ),
    };

    let confirmation = OutboundEmail {
        to: form.email.clone(),
        subject: "【セミナー】開催お知らせ登録を受け付けました".to_string(),
        html: format!(
            "<p>{name}様</p>\n<p>ご登録ありがとうございます。開催が決まり次第、このメールアドレスにお知らせいたします。</p>\n{}",
            signature(config),
        ),
    };

    FormMail {
        notification,
        confirmation,
    }
}
