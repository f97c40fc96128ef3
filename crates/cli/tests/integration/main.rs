mod common;
mod normalize_tests;
mod plan_tests;
mod resolve_tests;
mod verify_tests;
