use uuid::Uuid;

pub mod item;

pub mod job;

pub mod step;

/// Generates a short random name for unnamed steps and jobs.
fn build_name() -> String {
    let mut name = Uuid::new_v4().simple().to_string();
    name.truncate(8);
    name
}
