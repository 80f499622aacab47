//! English string table for the pages and errors this tool produces.

const STRINGS: &[(&str, &str)] = &[
    ("modulename", "Reengagement"),
    ("modulenameplural", "Reengagements"),
    ("user", "User"),
    ("emailtime", "Email time"),
    ("completiontime", "Completion time"),
    ("noreengagementsinprogress", "No reengagements in progress"),
    ("reengagementcompleted", "You have completed this activity."),
    (
        "reengagementinprogress",
        "This activity will be marked complete on {$a}.",
    ),
    ("errornoid", "You must specify a course_module ID or an instance ID"),
    (
        "errorreengagementnotvalid",
        "This reengagement module is not enabled for your account. Please contact your administrator if you feel this is in error",
    ),
    (
        "mustenablecompletionavailability",
        "Completion tracking and restrict access settings must be enabled for the reengagement activity to work correctly.",
    ),
    ("invalidrecord", "Can not find data record in database table {$a}."),
    ("requireloginerror", "You must log in to view this page."),
    ("invalidschedule", "The {$a} of this reengagement is out of range."),
    ("strftimedatetimeshort", "%d/%m/%y, %H:%M"),
];

/// Looks up a string, falling back to the bracketed key as the LMS does.
pub fn get_string(key: &str) -> String {
    STRINGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| format!("[[{key}]]"))
}

pub fn get_string_with(key: &str, a: &str) -> String {
    get_string(key).replace("{$a}", a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve() {
        assert_eq!(get_string("user"), "User");
    }

    #[test]
    fn unknown_keys_are_bracketed() {
        assert_eq!(get_string("nosuchstring"), "[[nosuchstring]]");
    }

    #[test]
    fn placeholder_is_substituted() {
        assert_eq!(
            get_string_with("invalidrecord", "course"),
            "Can not find data record in database table course."
        );
    }
}
