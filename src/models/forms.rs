use serde::Deserialize;

/// Topics selectable on the information-request form. Submissions may
/// only carry values from this list.
pub const RFI_INTERESTS: [&str; 5] = [
    "プロダクト開発",
    "AIチャットボット開発",
    "業務フロー改善",
    "IT技術顧問",
    "その他",
];

/// Non-blank after trimming and at most `max_chars` characters long.
pub(crate) fn is_valid_string(value: Option<&str>, max_chars: usize) -> bool {
    match value {
        Some(s) => !s.trim().is_empty() && s.chars().count() <= max_chars,
        None => false,
    }
}

/// Loose shape check: no whitespace, a single `@` with a non-empty local
/// part, and a dot somewhere inside the domain. Capped at 255 characters.
pub(crate) fn is_valid_email(value: Option<&str>) -> bool {
    let Some(email) = value else {
        return false;
    };
    if email.chars().count() > 255 || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain_has_inner_dot(domain)
        }
        None => false,
    }
}

fn domain_has_inner_dot(domain: &str) -> bool {
    let bytes = domain.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'.' && i > 0 && i < bytes.len() - 1)
}

/// Optional phone field: absent or blank collapses to `None`, anything
/// longer than 20 characters is rejected.
fn clean_phone(value: Option<&str>) -> Result<Option<String>, &'static str> {
    match value {
        None => Ok(None),
        Some(p) if p.is_empty() => Ok(None),
        Some(p) if p.chars().count() > 20 => Err("Invalid phone number"),
        Some(p) => {
            let trimmed = p.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

fn trimmed(value: Option<&str>) -> String {
    value.unwrap_or_default().trim().to_string()
}

/// Contact form as posted by the browser. Every field is optional at the
/// wire level; `validate` decides what is actually required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub company: Option<String>,
    pub department: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactSubmission {
    pub company: String,
    pub department: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(self) -> Result<ContactSubmission, &'static str> {
        if !is_valid_string(self.company.as_deref(), 100) {
            return Err("Invalid company name");
        }
        if !is_valid_string(self.department.as_deref(), 100) {
            return Err("Invalid department");
        }
        if !is_valid_string(self.name.as_deref(), 100) {
            return Err("Invalid name");
        }
        if !is_valid_email(self.email.as_deref()) {
            return Err("Invalid email");
        }
        let phone = clean_phone(self.phone.as_deref())?;
        if !is_valid_string(self.message.as_deref(), 2000) {
            return Err("Invalid message");
        }

        Ok(ContactSubmission {
            company: trimmed(self.company.as_deref()),
            department: trimmed(self.department.as_deref()),
            name: trimmed(self.name.as_deref()),
            email: trimmed(self.email.as_deref()),
            phone,
            message: trimmed(self.message.as_deref()),
        })
    }
}

/// Information-request form. `interests` must be present (an empty list
/// is allowed) and drawn from [`RFI_INTERESTS`]; the message is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RfiForm {
    pub company: Option<String>,
    pub department: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub interests: Option<Vec<String>>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfiSubmission {
    pub company: String,
    pub department: String,
    pub name: String,
    pub email: String,
    pub interests: Vec<String>,
    pub message: Option<String>,
}

impl RfiForm {
    pub fn validate(self) -> Result<RfiSubmission, &'static str> {
        if !is_valid_string(self.company.as_deref(), 100) {
            return Err("Invalid company name");
        }
        if !is_valid_string(self.department.as_deref(), 100) {
            return Err("Invalid department");
        }
        if !is_valid_string(self.name.as_deref(), 100) {
            return Err("Invalid name");
        }
        if !is_valid_email(self.email.as_deref()) {
            return Err("Invalid email");
        }
        let interests = match self.interests {
            Some(list) if list.iter().all(|i| RFI_INTERESTS.contains(&i.as_str())) => list,
            _ => return Err("Invalid interests"),
        };
        if let Some(message) = self.message.as_deref() {
            if message.chars().count() > 2000 {
                return Err("Message too long");
            }
        }

        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(RfiSubmission {
            company: trimmed(self.company.as_deref()),
            department: trimmed(self.department.as_deref()),
            name: trimmed(self.name.as_deref()),
            email: trimmed(self.email.as_deref()),
            interests,
            message,
        })
    }
}

/// Workshop entry form: the contact form shape with an optional message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkshopForm {
    pub company: Option<String>,
    pub department: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopSubmission {
    pub company: String,
    pub department: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
}

impl WorkshopForm {
    pub fn validate(self) -> Result<WorkshopSubmission, &'static str> {
        if !is_valid_string(self.company.as_deref(), 100) {
            return Err("Invalid company name");
        }
        if !is_valid_string(self.department.as_deref(), 100) {
            return Err("Invalid department");
        }
        if !is_valid_string(self.name.as_deref(), 100) {
            return Err("Invalid name");
        }
        if !is_valid_email(self.email.as_deref()) {
            return Err("Invalid email");
        }
        let phone = clean_phone(self.phone.as_deref())?;
        if let Some(message) = self.message.as_deref() {
            if message.chars().count() > 2000 {
                return Err("Invalid message");
            }
        }

        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(WorkshopSubmission {
            company: trimmed(self.company.as_deref()),
            department: trimmed(self.department.as_deref()),
            name: trimmed(self.name.as_deref()),
            email: trimmed(self.email.as_deref()),
            phone,
            message,
        })
    }
}

/// Seminar notification signup: just a name, an email, and an optional
/// message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeminarForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeminarSubmission {
    pub name: String,
    pub email: String,
    pub message: Option<String>,
}

impl SeminarForm {
    pub fn validate(self) -> Result<SeminarSubmission, &'static str> {
        if !is_valid_string(self.name.as_deref(), 100) {
            return Err("Invalid name");
        }
        if !is_valid_email(self.email.as_deref()) {
            return Err("Invalid email");
        }
        if let Some(message) = self.message.as_deref() {
            if message.chars().count() > 2000 {
                return Err("Message too long");
            }
        }

        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(SeminarSubmission {
            name: trimmed(self.name.as_deref()),
            email: trimmed(self.email.as_deref()),
            message,
        })
    }
}
