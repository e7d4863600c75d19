//! Subscription plans that ledger transactions pay for.
//!
//! This module contains:
//! - The `Plan` model and database functions for managing plans
//! - Route handlers for listing, creating, editing and deleting plans

mod core;
mod endpoints;

pub use core::{
    MAX_PERIOD_DAYS, Plan, PlanForm, create_plan, create_plan_table, delete_plan, get_all_plans, get_plan,
    update_plan,
};
pub use endpoints::{
    create_plan_endpoint, delete_plan_endpoint, get_plan_endpoint, get_plans_endpoint,
    update_plan_endpoint,
};
