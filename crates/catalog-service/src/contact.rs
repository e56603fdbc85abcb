//! WhatsApp contact links

use awire_common::Artisan;
use reqwest::Url;

/// Project line used when an artisan has no usable number
pub const PROJECT_WHATSAPP: &str = "5563992747396";

const WHATSAPP_BASE: &str = "https://wa.me";

fn digits(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

fn link(number: &str, message: &str) -> String {
    let mut number = digits(number);
    if number.is_empty() {
        number = PROJECT_WHATSAPP.to_string();
    }

    let base = format!("{}/{}", WHATSAPP_BASE, number);
    match Url::parse_with_params(&base, &[("text", message)]) {
        Ok(url) => url.to_string(),
        Err(_) => base,
    }
}

/// Link a visitor uses to ask an artisan about one product
pub fn product_link(whatsapp: &str, product_name: &str) -> String {
    link(
        whatsapp,
        &format!("Olá! Tenho interesse no produto: {}", product_name),
    )
}

/// Link from an artisan's profile page
pub fn profile_link(artisan: &Artisan) -> String {
    link(
        &artisan.whatsapp,
        &format!(
            "Olá {}, encontrei seu perfil no site AWIRE DIGITAL e gostaria de saber mais sobre seus artesanatos!",
            artisan.name
        ),
    )
}
