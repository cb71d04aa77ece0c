// Generation: turns a task plus the template resume into a tailored resume.
// All provider calls go through llm_client — no direct HTTP calls here.

pub mod client;
pub mod instruction;
pub mod prompts;

pub use client::{GenerationClient, GenerationError, RetryPolicy, TokioSleeper};
pub use instruction::{InputError, KeywordsInput, Task, TransformInstruction};
