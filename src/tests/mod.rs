pub mod support;

pub mod composite_tests;
