pub mod driver;
pub mod event;
pub mod report;

#[cfg(test)]
mod report_test;
