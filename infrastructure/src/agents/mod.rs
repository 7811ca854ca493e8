pub mod scripted;

pub use scripted::ScriptedAgent;
