#[path = "property/utils.rs"]
mod utils;

#[path = "property/actions.rs"]
mod actions;

#[path = "property/budget.rs"]
mod budget;
