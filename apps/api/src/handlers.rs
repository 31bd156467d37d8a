pub mod actions;
pub mod chat;
pub mod events;
pub mod health;
pub mod workflows;

#[cfg(test)]
mod tests;
