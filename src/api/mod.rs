mod deepseek;
mod gemini;
mod pdf_text;

pub mod llm;
