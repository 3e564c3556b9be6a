// Tests with the prefix 'mock_test_' use MockVM and need the feature 'mock_test'.
// Each test creates its own collector instance, so they can share a process.
#[cfg(feature = "mock_test")]
mod mock_tests;
