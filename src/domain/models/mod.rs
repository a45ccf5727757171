// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 质量等级（quality）：抓取结果的质量序号
/// - 抓取结果（scrape_result）：单次抓取的临时结果和产品字段
/// - 进度文档（progress）：可恢复的持久化运行进度
/// - 厂商队列（vendor_queue）：每个厂商的有序URL列表
/// - 缓存记录（cache_record）：共享缓存中的产品数据
/// - 运行汇总（run_summary）：一次运行的统计
pub mod cache_record;
pub mod progress;
pub mod quality;
pub mod run_summary;
pub mod scrape_result;
pub mod vendor_queue;
