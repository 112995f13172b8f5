//! Input validation for the auth endpoints.
//!
//! Validators collect every field error before failing so a client can fix a
//! form in one round trip. Registration is role-discriminated: sellers and
//! resellers must supply extra business attributes.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::Role, models::CreateUserEntity};

static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PINCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());
static GST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").unwrap()
});
static OTP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message).collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn is_valid_mobile(value: &str) -> bool {
    MOBILE_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Raw registration form as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub mobile: String,
    pub email: String,
    pub role: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    // seller
    pub business_name: Option<String>,
    pub gst_number: Option<String>,
    pub business_address: Option<String>,
    pub business_license: Option<String>,
    pub bank_account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub account_holder_name: Option<String>,
    // reseller
    pub company_name: Option<String>,
    pub reseller_type: Option<String>,
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Attributes that only some roles carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleProfile {
    Customer,
    Seller {
        business_name: String,
        business_address: String,
        gst_number: Option<String>,
        business_license: Option<String>,
        bank_account_number: Option<String>,
        ifsc_code: Option<String>,
        account_holder_name: Option<String>,
    },
    Reseller {
        company_name: String,
        reseller_type: String,
        tax_id: String,
    },
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Customer => Role::Customer,
            RoleProfile::Seller { .. } => Role::Seller,
            RoleProfile::Reseller { .. } => Role::Reseller,
        }
    }
}

/// A registration that passed validation; stored alongside the pending OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub mobile: String,
    pub email: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub profile: RoleProfile,
}

impl Registration {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Row for the `users` table. Registration completes only after OTP
    /// verification, so the account is marked verified.
    pub fn into_new_user(self) -> CreateUserEntity {
        let full_name = self.full_name();
        let role = self.profile.role().as_str().to_string();
        let mut user = CreateUserEntity {
            email: self.email,
            phone: self.mobile,
            full_name,
            role,
            business_name: None,
            gst_number: None,
            business_address: None,
            business_license: None,
            company_name: None,
            reseller_type: None,
            tax_id: None,
            is_verified: true,
        };
        match self.profile {
            RoleProfile::Customer => {}
            RoleProfile::Seller {
                business_name,
                business_address,
                gst_number,
                business_license,
                ..
            } => {
                user.business_name = Some(business_name);
                user.business_address = Some(business_address);
                user.gst_number = gst_number;
                user.business_license = business_license;
            }
            RoleProfile::Reseller {
                company_name,
                reseller_type,
                tax_id,
            } => {
                user.company_name = Some(company_name);
                user.reseller_type = Some(reseller_type);
                user.tax_id = Some(tax_id);
            }
        }
        user
    }
}

pub fn validate_registration(form: RegistrationForm) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    errors.check(
        min_chars(&form.first_name, 2),
        "first_name",
        "First name must be at least 2 characters",
    );
    errors.check(
        min_chars(&form.last_name, 2),
        "last_name",
        "Last name must be at least 2 characters",
    );

    let gender = match form.gender.as_str() {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        "other" => Some(Gender::Other),
        _ => None,
    };
    errors.check(gender.is_some(), "gender", "Please select a gender");

    let mobile = form.mobile.trim().to_string();
    errors.check(
        is_valid_mobile(&mobile),
        "mobile",
        "Please enter a valid 10-digit mobile number",
    );

    let email = form.email.trim().to_string();
    errors.check(
        is_valid_email(&email),
        "email",
        "Please enter a valid email address",
    );

    let pincode = non_blank(form.pincode);
    if let Some(pincode) = &pincode {
        errors.check(
            PINCODE_RE.is_match(pincode),
            "pincode",
            "Please enter a valid 6-digit pincode",
        );
    }

    let profile = match form.role.parse::<Role>() {
        Ok(Role::Customer) => Some(RoleProfile::Customer),
        Ok(Role::Seller) => {
            let business_name = form.business_name.unwrap_or_default();
            let business_address = form.business_address.unwrap_or_default();
            let gst_number = non_blank(form.gst_number);

            errors.check(
                min_chars(&business_name, 2),
                "business_name",
                "Business name is required",
            );
            errors.check(
                min_chars(&business_address, 5),
                "business_address",
                "Business address is required",
            );
            if let Some(gst) = &gst_number {
                errors.check(
                    GST_RE.is_match(gst),
                    "gst_number",
                    "Please enter a valid GST number",
                );
            }

            Some(RoleProfile::Seller {
                business_name: business_name.trim().to_string(),
                business_address: business_address.trim().to_string(),
                gst_number,
                business_license: non_blank(form.business_license),
                bank_account_number: non_blank(form.bank_account_number),
                ifsc_code: non_blank(form.ifsc_code),
                account_holder_name: non_blank(form.account_holder_name),
            })
        }
        Ok(Role::Reseller) => {
            let company_name = form.company_name.unwrap_or_default();
            let reseller_type = form.reseller_type.unwrap_or_default();
            let tax_id = form.tax_id.unwrap_or_default();

            errors.check(
                min_chars(&company_name, 2),
                "company_name",
                "Company name is required",
            );
            errors.check(
                min_chars(&reseller_type, 2),
                "reseller_type",
                "Reseller type is required",
            );
            errors.check(min_chars(&tax_id, 5), "tax_id", "Tax ID is required");

            Some(RoleProfile::Reseller {
                company_name: company_name.trim().to_string(),
                reseller_type: reseller_type.trim().to_string(),
                tax_id: tax_id.trim().to_string(),
            })
        }
        Err(_) => {
            errors.push("role", "Please select a user role");
            None
        }
    };

    errors.into_result(|| Registration {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        // both are Some when no errors were recorded
        gender: gender.unwrap_or(Gender::Other),
        mobile,
        email,
        address_line1: non_blank(form.address_line1),
        address_line2: non_blank(form.address_line2),
        city: non_blank(form.city),
        state: non_blank(form.state),
        pincode,
        profile: profile.unwrap_or(RoleProfile::Customer),
    })
}

/// Login identifier: a valid e-mail or a 10-digit mobile number.
pub fn validate_identifier(identifier: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let identifier = identifier.trim();
    if identifier.is_empty() {
        errors.push("identifier", "Please enter your email or mobile number");
    } else if !is_valid_email(identifier) && !is_valid_mobile(identifier) {
        errors.push(
            "identifier",
            "Please enter a valid email or 10-digit mobile number",
        );
    }
    errors.into_result(|| ())
}

pub fn validate_otp(otp: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if otp.chars().count() != 6 {
        errors.push("otp", "OTP must be 6 digits");
    } else if !OTP_RE.is_match(otp) {
        errors.push("otp", "OTP must contain only numbers");
    }
    errors.into_result(|| ())
}
