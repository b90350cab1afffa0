//! Built-in playground examples with precompiled module counterparts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example {
    pub id: &'static str,
    pub title: &'static str,
    pub source: &'static str,
}

pub const DEFAULT_EXAMPLE: &str = "hello";

pub const EXAMPLES: &[Example] = &[
    Example {
        id: "hello",
        title: "Hello World",
        source: r#"package main

import "fmt"

func main() {
    fmt.Println("Hello, World!")
}
"#,
    },
    Example {
        id: "fibonacci",
        title: "Fibonacci",
        source: r#"package main

import "fmt"

func fibonacci(n int) int {
    if n <= 1 {
        return n
    }
    return fibonacci(n-1) + fibonacci(n-2)
}

func main() {
    for i := 0; i < 10; i++ {
        fmt.Printf("fibonacci(%d) = %d\n", i, fibonacci(i))
    }
}
"#,
    },
    Example {
        id: "loop",
        title: "Loop",
        source: r#"package main

import "fmt"

func main() {
    for i := 1; i <= 5; i++ {
        fmt.Printf("Count: %d\n", i)
    }
    fmt.Println("Done!")
}
"#,
    },
];

pub fn find(id: &str) -> Option<&'static Example> {
    EXAMPLES.iter().find(|e| e.id == id)
}
