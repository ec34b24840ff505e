mod compile;
mod consult;
mod helper;
