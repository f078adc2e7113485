#[path = "model/grid_props.rs"]
mod grid_props;
#[path = "model/mask_queries.rs"]
mod mask_queries;
#[path = "model/spray_props.rs"]
mod spray_props;
