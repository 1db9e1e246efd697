mod common;
mod dispatch_tests;
mod schedule_tests;
