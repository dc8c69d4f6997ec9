// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Count-Min sketch for frequency estimation with top-K tracking.
//!
//! # Usage
//!
//! ```rust
//! use timebloom::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::new(1e-3, 0.01, 10)?;
//!
//! sketch.update("apple", 1);
//! sketch.update("banana", 3);
//!
//! assert!(sketch.estimate("banana") >= 3);
//! assert_eq!(sketch.top_keys()[0].0, b"banana".to_vec());
//! # Ok::<(), timebloom::error::Error>(())
//! ```

mod sketch;
pub use self::sketch::CountMinSketch;
