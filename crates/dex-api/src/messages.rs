//! User-facing wording for error responses and status notices.
//!
//! Codes are stable; messages follow the caller's `Accept-Language`.

use axum::http::{header::ACCEPT_LANGUAGE, HeaderMap};
use dex_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    /// Picks the highest-weighted supported language, defaulting to English.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let Some(raw) = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok()) else {
            return Locale::default();
        };

        let mut best: Option<(f32, Locale)> = None;
        for part in raw.split(',') {
            let mut pieces = part.trim().split(';');
            let tag = pieces.next().unwrap_or("").trim().to_ascii_lowercase();
            let weight = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);

            let locale = match tag.split('-').next() {
                Some("en") => Locale::En,
                Some("fr") => Locale::Fr,
                _ => continue,
            };
            if best.is_none_or(|(w, _)| weight > w) {
                best = Some((weight, locale));
            }
        }
        best.map(|(_, locale)| locale).unwrap_or_default()
    }
}

pub fn error_message(err: &AppError, locale: Locale) -> &'static str {
    match (err.code(), locale) {
        ("INVALID_ID", Locale::En) => "The entry identifier is not valid.",
        ("INVALID_ID", Locale::Fr) => "L'identifiant de l'entrée n'est pas valide.",
        ("INVALID_BODY", Locale::En) => "The request body could not be read.",
        ("INVALID_BODY", Locale::Fr) => "Le corps de la requête est illisible.",
        ("FORBIDDEN", Locale::En) => "You are not allowed to modify this entry.",
        ("FORBIDDEN", Locale::Fr) => "Vous n'êtes pas autorisé à modifier cette entrée.",
        ("POST_NOT_FOUND", Locale::En) => "Entry not found.",
        ("POST_NOT_FOUND", Locale::Fr) => "Entrée introuvable.",
        ("VALIDATION_ERROR", Locale::En) => "Some fields are invalid.",
        ("VALIDATION_ERROR", Locale::Fr) => "Certains champs sont invalides.",
        ("CONFIGURATION_ERROR", Locale::En) => "The server is not configured for this operation.",
        ("CONFIGURATION_ERROR", Locale::Fr) => {
            "Le serveur n'est pas configuré pour cette opération."
        }
        (_, Locale::En) => "A database error occurred. Please try again later.",
        (_, Locale::Fr) => "Une erreur de base de données est survenue. Réessayez plus tard.",
    }
}

pub fn method_not_allowed(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Method not allowed.",
        Locale::Fr => "Méthode non autorisée.",
    }
}

/// Shown after a rejected entry went back to the review queue.
pub fn resubmitted(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Your changes were saved and the entry was sent back for review.",
        Locale::Fr => "Vos modifications ont été enregistrées et l'entrée a été renvoyée en modération.",
    }
}
