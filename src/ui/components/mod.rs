pub mod quest_panel;
pub mod stats_bar;
pub mod story_panel;
pub mod typing_area;
