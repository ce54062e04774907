pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    PrintingRequests, PrintingUi, ReplaySource, format_cancel, load_config, load_trace,
    parse_trace, render_lists, render_reports, resolve_list_path,
};
