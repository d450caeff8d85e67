//! Washington OSPI school assessment reports: load a year's report, filter
//! it by grade, subject and student group, pivot it per school and compare
//! two columns across schools.

pub mod data;
