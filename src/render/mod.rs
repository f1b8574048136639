pub mod model;
pub mod text;

pub use model::{
    build_batch_view, build_history_view, build_result_card, build_rules_view, build_stats_view,
    status_line, ResultMode,
};
pub use text::{draw_batch, draw_history, draw_result, draw_rules, draw_stats};
