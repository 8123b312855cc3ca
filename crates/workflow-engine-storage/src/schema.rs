//! Diesel table definitions.
//!
//! SQLite has no native `Uuid`/`Json`/`Timestamptz` column types, so unlike
//! the teacher's Postgres `schema.rs` (`Uuid`, `Json`, `Timestamptz` straight
//! from `diesel::sql_types`), every such column here is `Text` and the
//! `models` module does the (de)serialization by hand at the boundary.

diesel::table! {
    executions (id) {
        id -> Text,
        workflow_name -> Text,
        status -> Text,
        started_at -> Text,
        completed_at -> Nullable<Text>,
        duration_ms -> Nullable<BigInt>,
        current_step -> Nullable<BigInt>,
        total_steps -> Nullable<BigInt>,
        error -> Nullable<Text>,
        error_stack -> Nullable<Text>,
        parent_execution_id -> Nullable<Text>,
        parent_step_index -> Nullable<BigInt>,
        depth -> Integer,
        trigger -> Text,
        metadata -> Text,
    }
}

diesel::table! {
    steps (execution_id, step_index) {
        execution_id -> Text,
        step_index -> BigInt,
        step_name -> Text,
        action -> Text,
        description -> Nullable<Text>,
        status -> Text,
        started_at -> Text,
        completed_at -> Nullable<Text>,
        duration_ms -> Nullable<BigInt>,
        input -> Nullable<Text>,
        output -> Nullable<Text>,
        error -> Nullable<Text>,
        error_stack -> Nullable<Text>,
        child_execution_id -> Nullable<Text>,
        retry_attempt -> Integer,
        skip_reason -> Nullable<Text>,
    }
}

diesel::table! {
    contexts (execution_id) {
        execution_id -> Text,
        variables -> Text,
        updated_at -> Text,
    }
}

diesel::joinable!(steps -> executions (execution_id));
diesel::allow_tables_to_appear_in_same_query!(executions, steps, contexts);
