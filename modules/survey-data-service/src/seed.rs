//! Built-in dataset used to populate an empty store.

use survey_data_types::NewSurveyRecord;

/// The four default survey entries, in insertion order.
///
/// Entry 3 carries a lowercase `"male"`. It is kept verbatim: it passes the
/// case-insensitive domain check but does not match an exact `"Male"` filter.
pub fn default_records() -> Vec<NewSurveyRecord> {
    vec![
        NewSurveyRecord::new("18-24", "Male", "North America", "Mobile"),
        NewSurveyRecord::new("25-34", "Female", "Europe", "Desktop"),
        NewSurveyRecord::new("25-34", "male", "Europe", "Desktop"),
        NewSurveyRecord::new("35-44", "Other", "Asia", "Tablet"),
    ]
}
