mod common;
mod deploy_tests;
mod exec_tests;
mod list_tests;
mod plan_tests;
