// 🔔 Acknowledgement notices shown after a confirmed mutation

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn apartment_saved(created: bool, number: &str) -> Self {
        let (title, verb) = if created {
            ("Apartamento creado", "creado")
        } else {
            ("Apartamento actualizado", "actualizado")
        };
        Notice::success(
            title,
            format!("Apartamento {} ha sido {} exitosamente.", number, verb),
        )
    }

    pub fn owner_saved(created: bool, name: &str) -> Self {
        let (title, verb) = if created {
            ("Propietario creado", "creado")
        } else {
            ("Propietario actualizado", "actualizado")
        };
        Notice::success(title, format!("{} ha sido {} exitosamente.", name, verb))
    }

    pub fn owner_linked(owner_name: &str, apartment_number: &str) -> Self {
        Notice::success(
            "Propietario vinculado",
            format!(
                "{} ha sido vinculado al apartamento {}.",
                owner_name, apartment_number
            ),
        )
    }

    pub fn owner_unlinked(owner_name: &str, apartment_number: &str) -> Self {
        Notice::success(
            "Propietario desvinculado",
            format!(
                "{} ha sido desvinculado del apartamento {}.",
                owner_name, apartment_number
            ),
        )
    }

    /// Inline error surfaced when a submit is blocked by field errors
    pub fn validation_failed(count: usize) -> Self {
        Notice::error(
            "Error",
            format!("Por favor corrige {} campo(s) antes de guardar", count),
        )
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texts() {
        assert_eq!(
            Notice::apartment_saved(true, "101").description,
            "Apartamento 101 ha sido creado exitosamente."
        );
        assert_eq!(Notice::owner_saved(false, "Ana").title, "Propietario actualizado");
        assert_eq!(
            Notice::owner_unlinked("Carlos", "101").description,
            "Carlos ha sido desvinculado del apartamento 101."
        );
        assert!(Notice::validation_failed(2).is_error());
    }
}
