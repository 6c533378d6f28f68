// src/common/fallback.rs

// Valores padrão aplicados num único ponto: na montagem das respostas
// (services::catalog_service::present_*). Nenhum handler decide isso sozinho.

pub const NO_CATEGORY: &str = "Sin categoría";
pub const UNKNOWN_AUTHOR: &str = "Autor desconocido";
pub const UNKNOWN_PUBLISHER: &str = "Desconocida";
pub const EMPTY_SYNOPSIS: &str = "";
pub const PLACEHOLDER_COVER: &str = "/placeholder.svg";
pub const ANONYMOUS_REVIEWER: &str = "Usuario anónimo";

pub fn category(name: Option<&str>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or(NO_CATEGORY)
        .to_string()
}

pub fn author_line(authors: &[String]) -> String {
    if authors.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        authors.join(", ")
    }
}

pub fn cover(url: Option<&str>) -> String {
    url.filter(|u| !u.trim().is_empty())
        .unwrap_or(PLACEHOLDER_COVER)
        .to_string()
}

pub fn publisher(name: Option<&str>) -> String {
    name.unwrap_or(UNKNOWN_PUBLISHER).to_string()
}

pub fn synopsis(text: Option<&str>) -> String {
    text.unwrap_or(EMPTY_SYNOPSIS).to_string()
}

pub fn reviewer(name: Option<&str>, last_name: Option<&str>) -> String {
    match (name, last_name) {
        (Some(n), Some(l)) if !l.trim().is_empty() => format!("{} {}", n, l),
        (Some(n), _) => n.to_string(),
        _ => ANONYMOUS_REVIEWER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_fall_back_to_placeholders() {
        assert_eq!(category(None), NO_CATEGORY);
        assert_eq!(author_line(&[]), UNKNOWN_AUTHOR);
        assert_eq!(cover(Some("  ")), PLACEHOLDER_COVER);
        assert_eq!(reviewer(None, None), ANONYMOUS_REVIEWER);
        assert_eq!(reviewer(Some("Ana"), None), "Ana");
        assert_eq!(reviewer(Some("Ana"), Some("Ruiz")), "Ana Ruiz");
    }

    #[test]
    fn authors_are_joined_in_order() {
        let authors = vec!["Borges".to_string(), "Bioy Casares".to_string()];
        assert_eq!(author_line(&authors), "Borges, Bioy Casares");
    }
}
