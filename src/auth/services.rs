use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{SignupRequest, TokenRequest, UpdateProfileRequest},
    password::hash_password,
    repo_types::UserChanges,
};
use crate::error::{AppError, FieldErrors, REQUIRED};

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MAX_FIELD_LEN: usize = 255;

const BLANK: &str = "This field may not be blank.";
const BAD_EMAIL: &str = "Enter a valid email address.";

/// Signup payload after validation; the password is still plain text.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    email.len() <= MAX_FIELD_LEN && EMAIL_RE.is_match(email)
}

/// Trims the address and lower-cases its domain. The local part keeps its case.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn check_email(errors: &mut FieldErrors, raw: &str) -> Option<String> {
    let email = normalize_email(raw);
    if email.is_empty() {
        errors.add("email", BLANK);
        None
    } else if !is_valid_email(&email) {
        errors.add("email", BAD_EMAIL);
        None
    } else {
        Some(email)
    }
}

fn check_password(errors: &mut FieldErrors, password: &str) -> bool {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
        return false;
    }
    true
}

fn check_name(errors: &mut FieldErrors, raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", BLANK);
        None
    } else if name.chars().count() > MAX_FIELD_LEN {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_FIELD_LEN} characters."),
        );
        None
    } else {
        Some(name.to_string())
    }
}

pub fn validate_signup(req: SignupRequest) -> Result<NewUser, AppError> {
    let mut errors = FieldErrors::new();

    let email = match req.email.as_deref() {
        Some(raw) => check_email(&mut errors, raw),
        None => {
            errors.add("email", REQUIRED);
            None
        }
    };
    let password = match req.password {
        Some(p) if check_password(&mut errors, &p) => Some(p),
        Some(_) => None,
        None => {
            errors.add("password", REQUIRED);
            None
        }
    };
    let name = match req.name.as_deref() {
        Some(raw) => check_name(&mut errors, raw),
        None => {
            errors.add("name", REQUIRED);
            None
        }
    };

    match (email, password, name) {
        (Some(email), Some(password), Some(name)) if errors.is_empty() => Ok(NewUser {
            email,
            password,
            name,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

pub fn validate_credentials(req: TokenRequest) -> Result<Credentials, AppError> {
    let mut errors = FieldErrors::new();
    let email = req.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty());
    if email.is_none() {
        errors.add("email", REQUIRED);
    }
    let password = req.password.filter(|p| !p.is_empty());
    if password.is_none() {
        errors.add("password", REQUIRED);
    }
    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Validates a profile patch and hashes a new password if one is given.
pub fn validate_profile_update(req: UpdateProfileRequest) -> Result<UserChanges, AppError> {
    let mut errors = FieldErrors::new();
    let email = req.email.as_deref().and_then(|raw| check_email(&mut errors, raw));
    let name = req.name.as_deref().and_then(|raw| check_name(&mut errors, raw));
    let password = req
        .password
        .filter(|p| check_password(&mut errors, p));
    errors.into_result()?;

    let password_hash = password.as_deref().map(hash_password).transpose()?;
    Ok(UserChanges {
        email,
        name,
        password_hash,
    })
}
