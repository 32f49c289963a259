pub mod benchtemplate;
pub mod planbench;
pub mod runbench;
