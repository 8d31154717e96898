mod common;
mod delete_tests;
mod deploy_tests;
mod project_tests;
