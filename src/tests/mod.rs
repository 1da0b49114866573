mod test_utils;
mod tool_base_test;
mod pipeline_test;
