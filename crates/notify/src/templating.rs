//! Placeholder substitution for notification messages.
//!
//! Templates are free text with fixed bracket tokens:
//!
//! | Token               | Value                                    |
//! |---------------------|------------------------------------------|
//! | `[NOME]`            | employee name                            |
//! | `[CARGO]`           | employee position                        |
//! | `[IDADE]`           | reference year minus birth year          |
//! | `[DATA_NASCIMENTO]` | birth date as `dd/mm/yyyy`               |
//!
//! Any other bracketed text is left untouched. Rendering never fails.

use chrono::Datelike;

use parabens_core::Employee;

/// Renders message templates against an employee for a given calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRenderer {
    reference_year: i32,
}

impl TemplateRenderer {
    /// Create a renderer whose `[IDADE]` is computed against `reference_year`.
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    /// Substitute every known placeholder in `template`.
    pub fn render(&self, template: &str, employee: &Employee) -> String {
        let birth = employee.birth_date;
        let age = self.reference_year - birth.year();
        let birth_date = format!("{:02}/{:02}/{:04}", birth.day(), birth.month(), birth.year());

        template
            .replace("[NOME]", &employee.name)
            .replace("[CARGO]", &employee.position)
            .replace("[IDADE]", &age.to_string())
            .replace("[DATA_NASCIMENTO]", &birth_date)
    }
}
