// Fan a command out across the scope and print the merged report
pub mod exec;
