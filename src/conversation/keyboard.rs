//! Outbound replies and reply keyboards.

use super::session::Category;

/// Label of the "no value" choice in option keyboards.
pub const SKIP_LABEL: &str = "Пропустить";

const OPTIONS_PER_ROW: usize = 3;

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the user currently sees
    #[default]
    Unchanged,
    /// Hide the custom keyboard
    Remove,
    /// One-time, resized reply keyboard
    Choices(Vec<Vec<String>>),
}

/// One message sent back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Unchanged,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    pub fn removing_keyboard(text: impl Into<String>) -> Self {
        Self::with_keyboard(text, Keyboard::Remove)
    }
}

/// `[["Идея", "Задача", "Ссылка"]]`
pub fn category_keyboard() -> Keyboard {
    Keyboard::Choices(vec![Category::ALL
        .iter()
        .map(|c| c.label().to_string())
        .collect()])
}

/// Options three per row, then a row holding only the skip choice.
pub fn options_keyboard(options: &[String]) -> Keyboard {
    let mut rows: Vec<Vec<String>> = options
        .chunks(OPTIONS_PER_ROW)
        .map(|chunk| chunk.to_vec())
        .collect();
    rows.push(vec![SKIP_LABEL.to_string()]);
    Keyboard::Choices(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("o{}", i)).collect()
    }

    #[test]
    fn category_keyboard_is_one_row() {
        assert_eq!(
            category_keyboard(),
            Keyboard::Choices(vec![vec![
                "Идея".to_string(),
                "Задача".to_string(),
                "Ссылка".to_string()
            ]])
        );
    }

    #[test]
    fn options_are_chunked_by_three_with_skip_row() {
        let Keyboard::Choices(rows) = options_keyboard(&labels(5)) else {
            panic!("expected choices");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["o1", "o2", "o3"]);
        assert_eq!(rows[1], vec!["o4", "o5"]);
        assert_eq!(rows[2], vec![SKIP_LABEL]);
    }

    #[test]
    fn exact_multiple_has_no_partial_row() {
        let Keyboard::Choices(rows) = options_keyboard(&labels(3)) else {
            panic!("expected choices");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![SKIP_LABEL]);
    }
}
