pub mod clipboard_stack;
