pub mod customer;
pub mod customer_care;
pub mod opportunity;
pub mod project_survey;
pub mod quotation;
pub mod quotation_status_history;
pub mod sequence_counter;
pub mod service_package;
pub mod user;
