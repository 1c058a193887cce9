use crate::error::OptionError;

/// Longest label accepted for a title, axis label or legend entry.
pub const MAX_LABEL_LEN: usize = 200;

/// One named cosmetic step, run once.
pub type OptionStep<'a> = (&'static str, Box<dyn FnOnce() -> Result<(), OptionError> + 'a>);

/// Check a user-supplied label.
///
/// Blank values mean "not set" (`Ok(None)`); values containing control
/// characters or longer than [`MAX_LABEL_LEN`] are rejected.
pub fn validate_label(option: &'static str, value: Option<&str>) -> Result<Option<String>, OptionError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_LABEL_LEN {
        return Err(OptionError::Invalid {
            option,
            reason: format!("longer than {MAX_LABEL_LEN} characters"),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(OptionError::Invalid {
            option,
            reason: "contains control characters".into(),
        });
    }
    Ok(Some(value.to_string()))
}

/// Run every step in order. A failing step is logged and dropped; it never
/// stops the steps after it. Returns the names of the steps that succeeded.
pub fn apply_best_effort(steps: Vec<OptionStep<'_>>) -> Vec<&'static str> {
    let mut applied = Vec::with_capacity(steps.len());
    for (name, step) in steps {
        match step() {
            Ok(()) => applied.push(name),
            Err(e) => log::debug!("skipping chart option '{name}': {e}"),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_labels_are_unset() {
        assert_eq!(validate_label("title", None).unwrap(), None);
        assert_eq!(validate_label("title", Some("   ")).unwrap(), None);
        assert_eq!(
            validate_label("title", Some(" Sales ")).unwrap(),
            Some("Sales".to_string())
        );
    }

    #[test]
    fn invalid_labels_are_rejected() {
        assert!(validate_label("title", Some("bad\u{0}title")).is_err());
        let long = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(matches!(
            validate_label("x_label", Some(&long)),
            Err(OptionError::Invalid { option: "x_label", .. })
        ));
    }

    #[test]
    fn failures_do_not_stop_later_steps() {
        let mut ran_last = false;
        let mut steps: Vec<OptionStep<'_>> = Vec::new();
        steps.push(("title", Box::new(|| Ok(()))));
        steps.push((
            "x_label",
            Box::new(|| {
                Err(OptionError::Draw {
                    option: "x_label",
                    reason: "no font".into(),
                })
            }),
        ));
        steps.push((
            "legend",
            Box::new(|| {
                ran_last = true;
                Ok(())
            }),
        ));
        let applied = apply_best_effort(steps);
        assert_eq!(applied, vec!["title", "legend"]);
        assert!(ran_last);
    }
}
